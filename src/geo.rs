//! Best-effort lookup of where the benchmark ran from.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::NetworkError;
use crate::schema::GeoLocation;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// ip-api.com response shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    query: Option<String>,
    country: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    timezone: Option<String>,
    isp: Option<String>,
}

impl IpApiResponse {
    fn into_location(self) -> Result<GeoLocation, NetworkError> {
        if self.status != "success" {
            return Err(NetworkError::Lookup(
                self.message.unwrap_or_else(|| format!("status {}", self.status)),
            ));
        }
        Ok(GeoLocation {
            success: true,
            ip: self.query,
            country: self.country,
            region: self.region_name,
            city: self.city,
            timezone: self.timezone,
            isp: self.isp,
            error: None,
        })
    }
}

async fn fetch(endpoint: &str) -> Result<GeoLocation, NetworkError> {
    let client = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
    let resp: IpApiResponse = client
        .get(endpoint)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    resp.into_location()
}

/// Never fails: any error becomes `{ success: false, error }`.
pub async fn lookup(endpoint: &str) -> GeoLocation {
    match fetch(endpoint).await {
        Ok(location) => location,
        Err(err) => {
            warn!(error = %err, "geolocation unavailable");
            GeoLocation::unavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_successful_response() {
        let resp: IpApiResponse = serde_json::from_str(
            r#"{"status":"success","country":"Germany","regionName":"Hesse","city":"Frankfurt am Main","timezone":"Europe/Berlin","isp":"Example GmbH","query":"203.0.113.7"}"#,
        )
        .unwrap();
        let geo = resp.into_location().unwrap();
        assert!(geo.success);
        assert_eq!(geo.city.as_deref(), Some("Frankfurt am Main"));
        assert_eq!(geo.region.as_deref(), Some("Hesse"));
        assert_eq!(geo.ip.as_deref(), Some("203.0.113.7"));
        assert!(geo.error.is_none());
    }

    #[test]
    fn failed_lookup_keeps_message() {
        let resp: IpApiResponse = serde_json::from_str(
            r#"{"status":"fail","message":"reserved range","query":"127.0.0.1"}"#,
        )
        .unwrap();
        let err = resp.into_location().unwrap_err();
        assert!(err.to_string().contains("reserved range"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades() {
        let geo = lookup("http://127.0.0.1:1/json").await;
        assert!(!geo.success);
        assert!(geo.error.is_some());
        assert!(geo.country.is_none());
    }
}
