//! Shared test doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use transloader::common::AppState;
use transloader::config::Config;
use transloader::error::{AppError, AppResult};
use transloader::http::{HttpResponse, HttpTransport};

pub const DESTINATION: &str = "http://sta.example.com/v1.1";

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

/// In-memory transport.
///
/// GET/HEAD answers are scripted per URL (queued responses are consumed in
/// order, the last one repeats). POSTs succeed with `201 Created` and a
/// `Location` of `<url>(<n>)` unless a failure was scripted for that URL.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<Request>>,
    gets: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    heads: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    post_failures: Mutex<HashMap<String, u16>>,
    next_id: Mutex<u64>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_get(&self, url: &str, response: HttpResponse) {
        push(&self.gets, url, response);
    }

    pub fn on_head(&self, url: &str, response: HttpResponse) {
        push(&self.heads, url, response);
    }

    pub fn fail_posts_to(&self, url: &str, status: u16) {
        self.post_failures
            .lock()
            .unwrap()
            .insert(url.to_string(), status);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }

    pub fn posts_to(&self, suffix: &str) -> Vec<Request> {
        self.posts()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.requests().iter().map(|r| r.method).collect()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record(&self, method: &'static str, url: &str, headers: &[(&str, &str)], body: Option<&serde_json::Value>) {
        self.requests.lock().unwrap().push(Request {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: body.cloned(),
        });
    }
}

fn push(map: &Mutex<HashMap<String, VecDeque<HttpResponse>>>, url: &str, response: HttpResponse) {
    map.lock()
        .unwrap()
        .entry(url.to_string())
        .or_default()
        .push_back(response);
}

fn pop(map: &Mutex<HashMap<String, VecDeque<HttpResponse>>>, url: &str) -> Option<HttpResponse> {
    let mut map = map.lock().unwrap();
    let queue = map.get_mut(url)?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn head(&self, url: &str, headers: &[(&str, &str)]) -> AppResult<HttpResponse> {
        self.record("HEAD", url, headers, None);
        let response = pop(&self.heads, url).unwrap_or_else(|| HttpResponse::new(404));
        if !response.is_success() {
            return Err(AppError::Download {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }

    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> AppResult<HttpResponse> {
        self.record("GET", url, headers, None);
        let response = pop(&self.gets, url).unwrap_or_else(|| HttpResponse::new(404));
        if !response.is_success() && response.status != 416 {
            return Err(AppError::Download {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> AppResult<HttpResponse> {
        self.record("POST", url, &[], Some(body));

        if let Some(status) = self.post_failures.lock().unwrap().get(url) {
            return Ok(HttpResponse::new(*status).with_body("rejected"));
        }

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        Ok(HttpResponse::new(201).with_header("Location", format!("{url}({id})")))
    }
}

/// Application state wired to `transport`, with sources pointed at example.com.
pub fn state(transport: Arc<MockTransport>) -> AppState {
    let config = Config {
        ec_station_list_url: "http://ec.example.com/stations.csv".to_string(),
        ec_swob_base_url: "http://ec.example.com/swob".to_string(),
        data_garrison_base_url: "http://dg.example.com".to_string(),
        ..Config::default()
    };
    AppState::with_transport(config, transport)
}

pub const STATION_LIST: &str = "IATA_ID,Name,WMO_ID,MSC_ID,Latitude,Longitude,Elevation(m),Data_Provider,Dataset/Network,AUTO/MAN,Province/Territory\n\
XCM,CAMBRIDGE BAY,71925,2400595,69.108,-105.138,31.1,NAV CANADA,DND,AUTO,NU\n\
YYC,CALGARY INTL,71877,3031092,51.114,-114.020,1084.1,NAV CANADA,NAV,MAN,AB\n";

pub const SWOB_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<om:ObservationCollection xmlns:om="http://www.opengis.net/om/1.0" xmlns:gml="http://www.opengis.net/gml">
  <om:member><om:Observation>
    <om:metadata><set><identification-elements>
      <element name="stn_nam" uom="unitless" value="CAMBRIDGE BAY"/>
      <element name="date_tm" uom="datetime" value="2019-10-31T21:00:00.000Z"/>
      <element name="lat" uom="deg" value="69.108"/>
      <element name="long" uom="deg" value="-105.138"/>
    </identification-elements></set></om:metadata>
    <om:samplingTime><gml:TimeInstant><gml:timePosition>2019-10-31T21:00:00.000Z</gml:timePosition></gml:TimeInstant></om:samplingTime>
    <om:result><elements>
      <element name="air_temp" uom="°C" value="-12.5"/>
      <element name="data_avail" uom="%" value="100.0"/>
      <element name="stn_pres" uom="hPa" value="1012.3"/>
    </elements></om:result>
  </om:Observation></om:member>
</om:ObservationCollection>"#;

pub const TOA5_FILE: &str = "\"TOA5\",\"CBAY_MET\",\"CR1000\",\"12345\",\"CR1000.Std.32\",\"CPU:met.CR1\",\"5327\",\"CBAY_MET_1HR\"\n\
\"TIMESTAMP\",\"RECORD\",\"BP_Avg\",\"AirTC_Avg\"\n\
\"TS\",\"RN\",\"mbar\",\"Deg C\"\n\
\"\",\"\",\"Avg\",\"Avg\"\n\
\"2019-07-03 14:00:00\",1,1013.2,4.5\n\
\"2019-07-03 15:00:00\",2,1013.0,4.9\n";

pub const HOBO_FILE: &str = "Station ID: 300234065673960\n\
Title: Cambridge Bay\n\
Latitude: 69.12\n\
Longitude: -105.06\n\
\n\
Date Time, GMT-06:00\tPressure, mbar\tTemperature, *C\n\
07/03/19 14:00:00\t1013.2\t4.5\n\
07/03/19 14:15:00\t1013.1\t4.6\n";

pub fn ok_body(body: &str) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Length", body.len().to_string())
        .with_header("Last-Modified", "Wed, 03 Jul 2019 21:00:00 GMT")
        .with_body(body.as_bytes().to_vec())
}

pub fn head_with_length(length: usize) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Length", length.to_string())
        .with_header("Last-Modified", "Wed, 03 Jul 2019 22:00:00 GMT")
}
