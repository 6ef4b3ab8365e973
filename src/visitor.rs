//! Visitor IP and location for the terminal widget
//!
//! The host performs two lookups (public IP, then location for that IP) and
//! hands the raw response bodies here. Any failure degrades to a fallback
//! record; nothing in here can block the page.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Public IP lookup endpoint
pub const IP_ENDPOINT: &str = "https://api.ipify.org?format=json";

/// Location lookup endpoint for one address
pub fn location_endpoint(ip: &str) -> String {
    format!("https://ipinfo.io/{}/json", ip)
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationResponse {
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    timezone: Option<String>,
    org: Option<String>,
    postal: Option<String>,
    loc: Option<String>,
}

/// What the terminal widget displays about the visitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorInfo {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub timezone: String,
    pub isp: String,
    pub postal: String,
    pub loc: String,
}

/// Extract the address from the IP lookup body
pub fn parse_ip(json: &str) -> Result<String, LookupError> {
    let response: IpResponse = serde_json::from_str(json)?;
    response
        .ip
        .filter(|ip| !ip.is_empty())
        .ok_or(LookupError::MissingField("ip"))
}

/// Drop a leading autonomous-system tag (`AS15169 Google LLC` → `Google LLC`)
pub fn strip_asn(org: &str) -> &str {
    let Some(rest) = org.strip_prefix("AS") else {
        return org;
    };
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return org;
    }
    let after = &rest[digits..];
    let trimmed = after.trim_start();
    if trimmed.len() == after.len() {
        // No separator after the number
        return org;
    }
    trimmed
}

fn or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl VisitorInfo {
    /// Build from a successful location lookup body
    pub fn from_location(ip: &str, json: &str) -> Result<Self, LookupError> {
        let location: LocationResponse = serde_json::from_str(json)?;
        Ok(Self {
            ip: ip.to_string(),
            city: or(location.city, "Unknown"),
            region: or(location.region, "Unknown"),
            country: or(location.country, "Unknown"),
            timezone: or(location.timezone, "UTC"),
            isp: location
                .org
                .as_deref()
                .filter(|o| !o.is_empty())
                .map(|o| strip_asn(o).to_string())
                .unwrap_or_else(|| "Unknown ISP".to_string()),
            postal: or(location.postal, "N/A"),
            loc: or(location.loc, "0,0"),
        })
    }

    /// The address is known but its location lookup failed
    pub fn ip_only(ip: &str) -> Self {
        Self {
            ip: ip.to_string(),
            city: "Location Hidden".to_string(),
            region: "Protected".to_string(),
            country: "Secured".to_string(),
            timezone: "Local".to_string(),
            isp: "Network Protected".to_string(),
            postal: "N/A".to_string(),
            loc: "0,0".to_string(),
        }
    }

    /// Nothing could be looked up; invent an address
    pub fn placeholder<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let octets: [u8; 4] = std::array::from_fn(|_| rng.random_range(0..255));
        Self {
            ip: format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]),
            city: "Unknown City".to_string(),
            region: "Unknown Region".to_string(),
            country: "Unknown".to_string(),
            timezone: "UTC".to_string(),
            isp: "Unknown Network".to_string(),
            postal: "N/A".to_string(),
            loc: "0,0".to_string(),
        }
    }

    /// Resolve whatever the two lookups returned into a record.
    ///
    /// `ip_body` / `location_body` are `None` when the request itself failed.
    pub fn resolve<R: Rng + ?Sized>(
        ip_body: Option<&str>,
        location_body: Option<&str>,
        rng: &mut R,
    ) -> Self {
        let ip = match ip_body.map(parse_ip) {
            Some(Ok(ip)) => ip,
            Some(Err(e)) => {
                log::warn!("IP lookup failed: {}", e);
                return Self::placeholder(rng);
            }
            None => {
                log::warn!("IP lookup unavailable");
                return Self::placeholder(rng);
            }
        };

        match location_body.map(|body| Self::from_location(&ip, body)) {
            Some(Ok(info)) => info,
            Some(Err(e)) => {
                log::warn!("Location lookup failed: {}", e);
                Self::ip_only(&ip)
            }
            None => Self::ip_only(&ip),
        }
    }
}
