//! Sign numbers: sortable keys and automatic numbering

use crate::identity::{TemplateId, ZoneId};
use crate::model::{NumberingMode, Sign};
use crate::registry::Registry;

/// Width of each padded segment in a number sort key
pub const SEGMENT_WIDTH: usize = 15;

/// Left pad with zeros, keeping a leading sign character in front
fn zfill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let padding = "0".repeat(width - len);
    match s.chars().next() {
        Some(c @ ('+' | '-')) => format!("{}{}{}", c, padding, &s[c.len_utf8()..]),
        _ => format!("{}{}", padding, s),
    }
}

/// Right pad with zeros
fn ljust_zero(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    format!("{}{}", s, "0".repeat(width - len))
}

/// Encode a free-form sign number so plain string ordering follows numeric order
///
/// The part before the first `.` is zero filled on the left and everything
/// after it on the right, both to [`SEGMENT_WIDTH`]:
///
/// ```
/// use signage_core::number::encode_sort_key;
///
/// assert_eq!(encode_sort_key("7"), "000000000000007.000000000000000");
/// assert_eq!(encode_sort_key("1.11"), "000000000000001.110000000000000");
/// assert_eq!(encode_sort_key(""), "");
/// ```
///
/// Segments wider than the pad width are kept as-is.
pub fn encode_sort_key(number: &str) -> String {
    if number.is_empty() {
        return String::new();
    }
    let (left, right) = match number.split_once('.') {
        Some((left, right)) => (left, right),
        None => (number, ""),
    };
    format!(
        "{}.{}",
        zfill(left, SEGMENT_WIDTH),
        ljust_zero(right, SEGMENT_WIDTH)
    )
}

/// Next free number for a new sign under the project's numbering mode
///
/// Non-numeric numbers count as zero. The result keeps the zero padding of the
/// current maximum (`"007"` -> `"008"`). Returns `None` for manual numbering.
pub fn next_number(
    registry: &Registry,
    mode: NumberingMode,
    zone: ZoneId,
    template: Option<TemplateId>,
) -> Option<String> {
    let in_scope = |sign: &&Sign| match mode {
        NumberingMode::Manual => false,
        NumberingMode::ByLocation => sign.zone == Some(zone),
        NumberingMode::ByTypeLocation => sign.zone == Some(zone) && sign.template == template,
        NumberingMode::ByType => template.is_some() && sign.template == template,
    };
    if mode == NumberingMode::Manual {
        return None;
    }

    let mut largest: u64 = 0;
    let mut width = 0;
    for sign in registry.signs().filter(in_scope) {
        let value = sign.number.trim().parse::<u64>().unwrap_or(0);
        if value > largest {
            largest = value;
            width = sign.number.len();
        }
    }
    let largest = zfill(&largest.to_string(), width);
    let next = largest.parse::<u64>().unwrap_or(0) + 1;
    Some(zfill(&next.to_string(), largest.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::*;
    use crate::model::*;

    #[test]
    fn test_encode_fixed_inputs() {
        assert_eq!(encode_sort_key("7"), "000000000000007.000000000000000");
        assert_eq!(encode_sort_key("01"), "000000000000001.000000000000000");
        assert_eq!(encode_sort_key("1.11"), "000000000000001.110000000000000");
        assert_eq!(encode_sort_key("1.11.1"), "000000000000001.11.100000000000");
        assert_eq!(encode_sort_key("1.11.2"), "000000000000001.11.200000000000");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_sort_key(""), "");
    }

    #[test]
    fn test_encode_wide_segments_pass_through() {
        let wide = "1234567890123456789";
        assert_eq!(encode_sort_key(wide), format!("{}.000000000000000", wide));
        assert_eq!(
            encode_sort_key("1.1234567890123456789"),
            "000000000000001.1234567890123456789"
        );
    }

    #[test]
    fn test_encode_keeps_sign_in_front() {
        assert_eq!(encode_sort_key("-5"), "-00000000000005.000000000000000");
    }

    #[test]
    fn test_encode_monotonic_for_equal_shapes() {
        let numbers = ["1", "2", "9", "10", "42", "100"];
        for pair in numbers.windows(2) {
            assert!(encode_sort_key(pair[0]) < encode_sort_key(pair[1]));
        }
        let decimals = ["3.05", "3.1", "3.25", "3.9"];
        for pair in decimals.windows(2) {
            assert!(encode_sort_key(pair[0]) < encode_sort_key(pair[1]));
        }
    }

    fn registry_with_numbers(numbers: &[(&str, u64)]) -> (Registry, ZoneId) {
        let mut registry = Registry::new();
        let project = ProjectId::new(registry.allocate());
        registry.insert_project(Project::new(project, "Campus"));
        let zone = ZoneId::new(registry.allocate());
        registry.insert_zone(Zone::new(zone, project, "North"));
        let position = PositionId::new(registry.allocate());
        registry
            .save_position(Position::new(position, zone, 0.0, 0.0))
            .unwrap();
        for (number, template) in numbers {
            let mut sign = registry.new_sign(position);
            sign.zone = Some(zone);
            sign.template = Some(TemplateId::new(*template));
            sign.number = number.to_string();
            registry.insert_sign(sign);
        }
        (registry, zone)
    }

    #[test]
    fn test_next_number_keeps_padding() {
        let (registry, zone) = registry_with_numbers(&[("003", 1), ("007", 1), ("B-2", 1)]);
        let next = next_number(&registry, NumberingMode::ByLocation, zone, None);
        assert_eq!(next.as_deref(), Some("008"));
    }

    #[test]
    fn test_next_number_scoped_by_type() {
        let (registry, zone) = registry_with_numbers(&[("5", 1), ("12", 2)]);
        let t1 = Some(TemplateId::new(1));
        assert_eq!(
            next_number(&registry, NumberingMode::ByTypeLocation, zone, t1).as_deref(),
            Some("6")
        );
        assert_eq!(
            next_number(&registry, NumberingMode::ByType, zone, Some(TemplateId::new(2))).as_deref(),
            Some("13")
        );
    }

    #[test]
    fn test_next_number_non_numeric_counts_as_zero() {
        let (registry, zone) = registry_with_numbers(&[("lobby", 1)]);
        assert_eq!(
            next_number(&registry, NumberingMode::ByLocation, zone, None).as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_next_number_manual() {
        let (registry, zone) = registry_with_numbers(&[("1", 1)]);
        assert_eq!(next_number(&registry, NumberingMode::Manual, zone, None), None);
    }
}
