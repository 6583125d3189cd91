//! Keyword extraction over `{name, value}` specification lists
//!
//! Providers return specifications as free-form name/value pairs. This pure
//! function maps them onto normalized fields using case-insensitive keyword
//! rules. The first pair matching a field wins.

use crate::models::SpecItem;

const KW_TO_BHP: f64 = 1.341;
const LBFT_TO_NM: f64 = 1.3558;

/// Fields recognized in a specification list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecFields {
    pub engine_code: Option<String>,
    pub tyre_size_front: Option<String>,
    pub tyre_size_rear: Option<String>,
    pub tyre_pressure_front: Option<String>,
    pub tyre_pressure_rear: Option<String>,
    pub service_interval: Option<String>,
    pub power_bhp: Option<f64>,
    pub torque_nm: Option<f64>,
    pub co2_emissions: Option<f64>,
    pub euro_status: Option<String>,
    pub fuel_economy_mpg: Option<f64>,
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// First decimal number in a string ("99 bhp" -> 99.0, "1,234" -> 1234.0)
pub fn parse_number(value: &str) -> Option<f64> {
    let mut digits = String::new();
    let mut seen_dot = false;

    for c in value.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ',' if !digits.is_empty() => {}
            '.' if !digits.is_empty() && !seen_dot => {
                seen_dot = true;
                digits.push(c);
            }
            _ if !digits.is_empty() => break,
            _ => {}
        }
    }

    digits.trim_end_matches('.').parse().ok()
}

fn power_bhp(value: &str) -> Option<f64> {
    let number = parse_number(value)?;
    let unit = value.to_ascii_lowercase();
    if unit.contains("kw") && !unit.contains("bhp") && !unit.contains("hp") {
        Some((number * KW_TO_BHP).round())
    } else {
        Some(number)
    }
}

fn torque_nm(value: &str) -> Option<f64> {
    let number = parse_number(value)?;
    let unit = value.to_ascii_lowercase();
    if (unit.contains("lb") || unit.contains("ft")) && !unit.contains("nm") {
        Some((number * LBFT_TO_NM).round())
    } else {
        Some(number)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Scan a specification list for known fields
pub fn extract_spec_fields(items: &[SpecItem]) -> SpecFields {
    let mut fields = SpecFields::default();

    for item in items {
        let name = item.name.to_ascii_lowercase();
        let value = item.value.as_str();
        let has = |kw: &str| name.contains(kw);

        if has("engine") && has("code") {
            set_once(&mut fields.engine_code, non_empty(value));
        } else if has("tyre") || has("tire") {
            let front = has("front");
            let rear = has("rear");
            if has("size") {
                if front {
                    set_once(&mut fields.tyre_size_front, non_empty(value));
                }
                if rear {
                    set_once(&mut fields.tyre_size_rear, non_empty(value));
                }
            } else if has("pressure") {
                if front {
                    set_once(&mut fields.tyre_pressure_front, non_empty(value));
                }
                if rear {
                    set_once(&mut fields.tyre_pressure_rear, non_empty(value));
                }
            }
        } else if (has("timing") && has("belt")) || (has("service") && has("interval")) {
            set_once(&mut fields.service_interval, non_empty(value));
        } else if has("power") {
            set_once(&mut fields.power_bhp, power_bhp(value));
        } else if has("torque") {
            set_once(&mut fields.torque_nm, torque_nm(value));
        } else if has("co2") {
            set_once(&mut fields.co2_emissions, parse_number(value));
        } else if has("euro") {
            set_once(&mut fields.euro_status, non_empty(value));
        } else if has("mpg") || has("economy") {
            set_once(&mut fields.fuel_economy_mpg, parse_number(value));
        }
    }

    fields
}
