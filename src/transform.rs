//! Raw ADC to temperature transformation.
//!
//! STM32 boards report their internal temperature sensor as a raw
//! 12-bit ADC reading. The calibration constants differ per board
//! family; the device type is carried in the front of the `device`
//! value, e.g. `"l476,010203"`.

use crate::event::{find, find_entry, is_truthy, ValueEntry};
use serde_json::Value;

/// Convert a raw ADC reading (0-4095) to degrees Celsius.
///
/// Pure and deterministic. Unknown device types (including the empty
/// string) use the F103 Blue Pill calibration.
pub fn compute_temperature(raw_adc: f64, device_type: &str) -> f64 {
    let mv = raw_adc / 4095.0 * 3300.0;
    if device_type == "l476" {
        // STM32 L476
        (mv - 760.0) / 2.5 + 30.0
    } else {
        // STM32 F103 Blue Pill
        (mv - 1400.0) / 4.3 + 25.0
    }
}

/// Truncate to 2 decimal places, toward zero for negative values.
pub fn truncate2(temp: f64) -> f64 {
    (temp * 100.0).trunc() / 100.0
}

/// Device type from the `device` value, formatted `"<type>,<serial>"`.
///
/// Missing device yields the empty string, which routes to the default
/// calibration.
pub fn device_type_of(values: &[ValueEntry]) -> String {
    find(values, "device")
        .and_then(Value::as_str)
        .map(|device| device.split(',').next().unwrap_or("").to_string())
        .unwrap_or_default()
}

/// Apply the temperature transform to a batch, in place.
///
/// Returns `false` without touching the batch when the `transformed`
/// marker is already set (idempotency guard: `tmp` is never appended
/// twice). Otherwise sets the marker, and if a truthy raw `t` is
/// present with no computed `tmp` yet, appends `tmp` carrying the geo
/// annotation of the `t` entry.
pub fn apply(values: &mut Vec<ValueEntry>) -> bool {
    if is_truthy(find(values, "transformed")) {
        return false;
    }

    let device_type = device_type_of(values);
    let raw = find_entry(values, "t").cloned();
    let tmp_present = is_truthy(find(values, "tmp"));
    values.push(ValueEntry::new("transformed", true));

    if let Some(entry) = raw {
        if is_truthy(Some(&entry.value)) && !tmp_present {
            if let Some(raw_adc) = entry.value.as_f64() {
                let temp = truncate2(compute_temperature(raw_adc, &device_type));
                let mut computed = ValueEntry::new("tmp", temp);
                computed.geo = entry.geo;
                values.push(computed);
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Geo;
    use serde_json::json;

    #[test]
    fn test_compute_temperature_l476_zero_adc() {
        // (0/4095*3300 - 760)/2.5 + 30 = -274.0
        assert_eq!(truncate2(compute_temperature(0.0, "l476")), -274.0);
    }

    #[test]
    fn test_compute_temperature_f103_full_scale() {
        // (3300 - 1400)/4.3 + 25 = 466.8604... -> 466.86
        assert_eq!(truncate2(compute_temperature(4095.0, "f103")), 466.86);
    }

    #[test]
    fn test_compute_temperature_unknown_type_uses_default() {
        assert_eq!(
            compute_temperature(1744.0, ""),
            compute_temperature(1744.0, "f103")
        );
        assert_eq!(truncate2(compute_temperature(1744.0, "")), 26.26);
    }

    #[test]
    fn test_truncate2_truncates_not_rounds() {
        assert_eq!(truncate2(26.269), 26.26);
        assert_eq!(truncate2(26.2), 26.2);
        // Toward zero for sub-zero readings
        assert_eq!(truncate2(-241.765), -241.76);
    }

    #[test]
    fn test_negative_temperature_truncates_toward_zero() {
        // l476 at raw 100: -241.7655... -> -241.76 (not -241.77)
        assert_eq!(truncate2(compute_temperature(100.0, "l476")), -241.76);
    }

    #[test]
    fn test_device_type_of() {
        let values = vec![ValueEntry::new("device", "l476,010203")];
        assert_eq!(device_type_of(&values), "l476");

        let no_serial = vec![ValueEntry::new("device", "f103")];
        assert_eq!(device_type_of(&no_serial), "f103");

        assert_eq!(device_type_of(&[]), "");
    }

    #[test]
    fn test_apply_appends_marker_and_tmp() {
        let mut values = vec![
            ValueEntry::new("device", "f103,01"),
            ValueEntry::new("t", 1744),
        ];
        assert!(apply(&mut values));
        assert_eq!(find(&values, "transformed"), Some(&json!(true)));
        assert_eq!(find(&values, "tmp"), Some(&json!(26.26)));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut values = vec![
            ValueEntry::new("device", "f103,01"),
            ValueEntry::new("t", 1744),
        ];
        assert!(apply(&mut values));
        let len_after_first = values.len();

        // Second application must not append a second tmp
        assert!(!apply(&mut values));
        assert_eq!(values.len(), len_after_first);
    }

    #[test]
    fn test_apply_skips_tmp_when_already_computed() {
        let mut values = vec![
            ValueEntry::new("t", 1744),
            ValueEntry::new("tmp", 26.26),
        ];
        assert!(apply(&mut values));
        let tmp_count = values.iter().filter(|v| v.key == "tmp").count();
        assert_eq!(tmp_count, 1);
        assert_eq!(find(&values, "transformed"), Some(&json!(true)));
    }

    #[test]
    fn test_apply_without_raw_reading_only_marks() {
        let mut values = vec![ValueEntry::new("device", "f103,01")];
        assert!(apply(&mut values));
        assert_eq!(find(&values, "transformed"), Some(&json!(true)));
        assert_eq!(find(&values, "tmp"), None);
    }

    #[test]
    fn test_apply_copies_geo_from_raw_entry() {
        let mut raw = ValueEntry::new("t", 1744);
        raw.geo = Some(Geo {
            lat: 1.27,
            long: 103.8,
        });
        let mut values = vec![raw];
        assert!(apply(&mut values));
        let tmp = values.iter().find(|v| v.key == "tmp").unwrap();
        assert_eq!(tmp.geo.unwrap().long, 103.8);
    }
}
