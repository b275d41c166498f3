//! Environment Canada SWOB-ML documents and the MSC station list.
//!
//! A SWOB-ML file holds a single observation time. Station identity sits in
//! `identification-elements`; every measured property is an `element` inside
//! `om:result`:
//!
//! ```text
//! <om:result><elements>
//!   <element name="air_temp" uom="°C" value="-5.1"><qualifier .../></element>
//! </elements></om:result>
//! ```

use chrono::{DateTime, Utc};
use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

use crate::common::time::parse_iso8601;
use crate::entity::ObservationRecord;
use crate::error::{AppError, AppResult};
use crate::sources::{PropertyDef, SourceMetadata};

/// One `element` of the result block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwobElement {
    pub name: String,
    pub uom: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwobDocument {
    pub identification: BTreeMap<String, String>,
    pub sampling_time: Option<String>,
    pub results: Vec<SwobElement>,
}

impl SwobDocument {
    /// Observation time, from `gml:timePosition` or the `date_tm` element.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timestamp` if neither is present or parseable.
    pub fn observed_at(&self) -> AppResult<DateTime<Utc>> {
        let raw = self
            .sampling_time
            .as_deref()
            .or_else(|| self.identification.get("date_tm").map(String::as_str))
            .ok_or_else(|| AppError::Timestamp("SWOB-ML document has no sampling time".to_string()))?;
        parse_iso8601(raw)
    }

    #[must_use]
    pub fn metadata(&self) -> SourceMetadata {
        let number = |key: &str| {
            self.identification
                .get(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
        };

        SourceMetadata {
            name: self.identification.get("stn_nam").cloned(),
            latitude: number("lat"),
            longitude: number("long"),
            elevation: number("stn_elev"),
            timezone_offset: Some("Z".to_string()),
            properties: self.identification.clone(),
            property_defs: self
                .results
                .iter()
                .map(|e| PropertyDef {
                    id: e.name.clone(),
                    units: e.uom.clone(),
                })
                .collect(),
        }
    }

    /// Every result element that carries a value, stamped with the sampling time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timestamp` if the document has no usable time.
    pub fn observations(&self) -> AppResult<Vec<ObservationRecord>> {
        let timestamp = self.observed_at()?;
        Ok(self
            .results
            .iter()
            .filter_map(|e| {
                e.value
                    .as_deref()
                    .filter(|v| !super::is_missing(v))
                    .map(|v| ObservationRecord::new(timestamp, &e.name, v))
            })
            .collect())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Identification,
    Result,
}

/// Parse a SWOB-ML document.
///
/// # Errors
///
/// Returns `AppError::Xml` on malformed XML.
pub fn parse(xml: &[u8]) -> AppResult<SwobDocument> {
    let mut reader = XmlReader::from_reader(xml);
    reader.trim_text(true);

    let mut document = SwobDocument::default();
    let mut section = Section::Other;
    let mut in_time_position = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                match e.local_name().as_ref() {
                    b"identification-elements" => section = Section::Identification,
                    b"result" => section = Section::Result,
                    b"timePosition" => in_time_position = true,
                    b"element" => collect_element(&e, section, &mut document)?,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"element" {
                    collect_element(&e, section, &mut document)?;
                }
            }
            Event::Text(t) => {
                if in_time_position && document.sampling_time.is_none() {
                    document.sampling_time = Some(t.unescape()?.trim().to_string());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"identification-elements" | b"result" => section = Section::Other,
                b"timePosition" => in_time_position = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(document)
}

fn collect_element(
    element: &BytesStart<'_>,
    section: Section,
    document: &mut SwobDocument,
) -> AppResult<()> {
    if section == Section::Other {
        return Ok(());
    }

    let mut name = None;
    let mut uom = None;
    let mut value = None;
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let text = attr.unescape_value()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(text),
            b"uom" => uom = Some(text).filter(|u| u != "unitless"),
            b"value" => value = Some(text),
            _ => {}
        }
    }

    let Some(name) = name else {
        return Ok(());
    };

    match section {
        Section::Identification => {
            document
                .identification
                .insert(name, value.unwrap_or_default());
        }
        Section::Result => document.results.push(SwobElement { name, uom, value }),
        Section::Other => {}
    }
    Ok(())
}

/// One row of the MSC SWOB station list CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationListing {
    pub iata_id: String,
    pub name: String,
    pub wmo_id: Option<String>,
    pub msc_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub province: Option<String>,
    pub auto_man: Option<String>,
}

impl StationListing {
    /// SWOB-ML file names use the four-letter id (`CXCM`); the list carries
    /// the three-letter IATA code (`XCM`). Either matches.
    #[must_use]
    pub fn matches(&self, station_id: &str) -> bool {
        let id = station_id.trim();
        id.eq_ignore_ascii_case(&self.iata_id)
            || id.eq_ignore_ascii_case(&format!("C{}", self.iata_id))
            || self.msc_id.as_deref().is_some_and(|m| id.eq_ignore_ascii_case(m))
            || self.wmo_id.as_deref().is_some_and(|w| id == w)
    }

    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();
        let mut put = |key: &str, value: Option<&String>| {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                properties.insert(key.to_string(), v.clone());
            }
        };
        put("iata_id", Some(&self.iata_id));
        put("wmo_id", self.wmo_id.as_ref());
        put("msc_id", self.msc_id.as_ref());
        put("province", self.province.as_ref());
        put("auto_man", self.auto_man.as_ref());
        properties
    }
}

/// Parse the station list CSV, locating columns by header name.
///
/// # Errors
///
/// Returns `AppError::Parse` if the `IATA_ID` column is missing.
pub fn parse_station_list(body: &[u8]) -> AppResult<Vec<StationListing>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };

    let iata = column("IATA_ID")
        .ok_or_else(|| AppError::Parse("station list has no IATA_ID column".to_string()))?;
    let name = column("Name");
    let wmo = column("WMO_ID");
    let msc = column("MSC_ID");
    let lat = column("Latitude");
    let long = column("Longitude");
    let elev = column("Elevation(m)");
    let province = column("Province/Territory");
    let auto_man = column("AUTO/MAN");

    let mut listings = Vec::new();
    for record in reader.records() {
        let record = record?;
        let text = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        };
        let number = |index: Option<usize>| text(index).and_then(|v| v.parse::<f64>().ok());

        let Some(iata_id) = text(Some(iata)) else {
            continue;
        };

        listings.push(StationListing {
            iata_id,
            name: text(name).unwrap_or_default(),
            wmo_id: text(wmo),
            msc_id: text(msc),
            latitude: number(lat),
            longitude: number(long),
            elevation: number(elev),
            province: text(province),
            auto_man: text(auto_man),
        });
    }

    Ok(listings)
}
