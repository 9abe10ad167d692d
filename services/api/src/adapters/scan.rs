//! services/api/src/adapters/scan.rs
//!
//! Adapters for the two single-shot acquisitions a student check-in needs:
//! the decoded QR payload and the device position. Both are produced on the
//! client; these adapters validate what the client reported.

use async_trait::async_trait;
use attendance_core::domain::GeoPoint;
use attendance_core::ports::{GeolocationService, PortError, PortResult, QrDecodeService};

/// Longest payload accepted from a scanner.
const MAX_PAYLOAD_LEN: usize = 512;

/// Treats the scanned text as the session code, trimmed.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextPayloadDecoder;

#[async_trait]
impl QrDecodeService for TextPayloadDecoder {
    async fn decode(&self, raw: &str) -> PortResult<String> {
        let payload = raw.trim();
        if payload.is_empty() {
            return Err(PortError::InvalidInput("QR payload is empty".to_string()));
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(PortError::InvalidInput(format!(
                "QR payload is longer than {MAX_PAYLOAD_LEN} bytes"
            )));
        }
        Ok(payload.to_string())
    }
}

/// The position the client attached to its request, if any.
#[derive(Clone, Copy, Debug)]
pub struct ReportedGeolocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl ReportedGeolocation {
    pub fn new(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[async_trait]
impl GeolocationService for ReportedGeolocation {
    async fn current_position(&self) -> PortResult<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                GeoPoint::new(latitude, longitude).map_err(PortError::InvalidInput)
            }
            _ => Err(PortError::Unavailable(
                "the device did not report a position".to_string(),
            )),
        }
    }
}
