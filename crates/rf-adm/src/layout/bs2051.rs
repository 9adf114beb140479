//! Standard BS.2051 loudspeaker layouts

use super::{Channel, Layout};
use crate::error::{AdmError, AdmResult};

/// Channel table entry: name, azimuth, elevation, azimuth range, elevation range
type Entry = (&'static str, f64, f64, (f64, f64), (f64, f64));

const M_000: Entry = ("M+000", 0.0, 0.0, (0.0, 0.0), (0.0, 0.0));
const M_030_FIXED: Entry = ("M+030", 30.0, 0.0, (30.0, 30.0), (0.0, 0.0));
const M_N030_FIXED: Entry = ("M-030", -30.0, 0.0, (-30.0, -30.0), (0.0, 0.0));
const M_030: Entry = ("M+030", 30.0, 0.0, (30.0, 45.0), (0.0, 0.0));
const M_N030: Entry = ("M-030", -30.0, 0.0, (-45.0, -30.0), (0.0, 0.0));
const M_060: Entry = ("M+060", 60.0, 0.0, (45.0, 60.0), (0.0, 0.0));
const M_N060: Entry = ("M-060", -60.0, 0.0, (-60.0, -45.0), (0.0, 0.0));
const M_090: Entry = ("M+090", 90.0, 0.0, (85.0, 110.0), (0.0, 0.0));
const M_N090: Entry = ("M-090", -90.0, 0.0, (-110.0, -85.0), (0.0, 0.0));
const M_110: Entry = ("M+110", 110.0, 0.0, (100.0, 120.0), (0.0, 15.0));
const M_N110: Entry = ("M-110", -110.0, 0.0, (-120.0, -100.0), (0.0, 15.0));
const M_135: Entry = ("M+135", 135.0, 0.0, (120.0, 150.0), (0.0, 15.0));
const M_N135: Entry = ("M-135", -135.0, 0.0, (-150.0, -120.0), (0.0, 15.0));
const M_180: Entry = ("M+180", 180.0, 0.0, (180.0, 180.0), (0.0, 15.0));
const M_SC: Entry = ("M+SC", 15.0, 0.0, (5.0, 60.0), (0.0, 0.0));
const M_NSC: Entry = ("M-SC", -15.0, 0.0, (-60.0, -5.0), (0.0, 0.0));

const U_000: Entry = ("U+000", 0.0, 30.0, (0.0, 0.0), (30.0, 45.0));
const U_030: Entry = ("U+030", 30.0, 30.0, (30.0, 45.0), (30.0, 55.0));
const U_N030: Entry = ("U-030", -30.0, 30.0, (-45.0, -30.0), (30.0, 55.0));
const U_045: Entry = ("U+045", 45.0, 30.0, (30.0, 45.0), (30.0, 55.0));
const U_N045: Entry = ("U-045", -45.0, 30.0, (-45.0, -30.0), (30.0, 55.0));
const U_090: Entry = ("U+090", 90.0, 30.0, (85.0, 110.0), (30.0, 45.0));
const U_N090: Entry = ("U-090", -90.0, 30.0, (-110.0, -85.0), (30.0, 45.0));
const U_110: Entry = ("U+110", 110.0, 30.0, (100.0, 135.0), (30.0, 55.0));
const U_N110: Entry = ("U-110", -110.0, 30.0, (-135.0, -100.0), (30.0, 55.0));
const U_135: Entry = ("U+135", 135.0, 30.0, (100.0, 150.0), (30.0, 55.0));
const U_N135: Entry = ("U-135", -135.0, 30.0, (-150.0, -100.0), (30.0, 55.0));
const U_180: Entry = ("U+180", 180.0, 30.0, (180.0, 180.0), (30.0, 45.0));
const UH_180: Entry = ("UH+180", 180.0, 45.0, (180.0, 180.0), (45.0, 90.0));
const T_000: Entry = ("T+000", 0.0, 90.0, (-180.0, 180.0), (90.0, 90.0));

const B_000: Entry = ("B+000", 0.0, -30.0, (0.0, 0.0), (-30.0, -15.0));
const B_045: Entry = ("B+045", 45.0, -30.0, (30.0, 45.0), (-30.0, -15.0));
const B_N045: Entry = ("B-045", -45.0, -30.0, (-45.0, -30.0), (-30.0, -15.0));

/// Names of all supported layouts
pub const LAYOUT_NAMES: [&str; 10] = [
    "0+2+0", "0+5+0", "2+5+0", "4+5+0", "4+5+1", "3+7+0", "4+9+0", "9+10+3", "0+7+0", "4+7+0",
];

fn entries(name: &str) -> Option<Vec<Entry>> {
    let lfe1: Entry = ("LFE1", 0.0, 0.0, (0.0, 0.0), (0.0, 0.0));
    let lfe2: Entry = ("LFE2", 0.0, 0.0, (0.0, 0.0), (0.0, 0.0));

    let base_5 = vec![M_030_FIXED, M_N030_FIXED, M_000, lfe1, M_110, M_N110];
    let base_7 = vec![M_030, M_N030, M_000, lfe1, M_090, M_N090, M_135, M_N135];

    let entries = match name {
        "0+2+0" => vec![M_030_FIXED, M_N030_FIXED],
        "0+5+0" => base_5,
        "2+5+0" => [base_5, vec![U_030, U_N030]].concat(),
        "4+5+0" => [base_5, vec![U_030, U_N030, U_110, U_N110]].concat(),
        "4+5+1" => [base_5, vec![U_030, U_N030, U_110, U_N110, B_000]].concat(),
        "3+7+0" => vec![
            M_000, M_030, M_N030, U_045, U_N045, M_090, M_N090, M_135, M_N135, UH_180, lfe1, lfe2,
        ],
        "4+9+0" => [base_7, vec![U_045, U_N045, U_135, U_N135, M_SC, M_NSC]].concat(),
        "9+10+3" => vec![
            M_060, M_N060, M_000, lfe1, M_135, M_N135, M_030, M_N030, M_180, lfe2, M_090,
            M_N090, U_045, U_N045, U_000, T_000, U_135, U_N135, U_090, U_N090, U_180, B_000,
            B_045, B_N045,
        ],
        "0+7+0" => base_7,
        "4+7+0" => [base_7, vec![U_045, U_N045, U_135, U_N135]].concat(),
        _ => return None,
    };
    Some(entries)
}

/// Get a standard layout by name (e.g., "4+5+0")
pub fn get_layout(name: &str) -> AdmResult<Layout> {
    let entries =
        entries(name).ok_or_else(|| AdmError::InvalidLayout(format!("unknown layout {name}")))?;

    let channels = entries
        .into_iter()
        .map(|(ch_name, az, el, az_range, el_range)| {
            if ch_name.starts_with("LFE") {
                Channel::new_lfe(ch_name)
            } else {
                Channel::new(ch_name, az, el).with_ranges(az_range, el_range)
            }
        })
        .collect();

    Layout::new(name, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_layouts() {
        let expected = [
            ("0+2+0", 2, 0),
            ("0+5+0", 6, 1),
            ("2+5+0", 8, 1),
            ("4+5+0", 10, 1),
            ("4+5+1", 11, 1),
            ("3+7+0", 12, 2),
            ("4+9+0", 14, 1),
            ("9+10+3", 24, 2),
            ("0+7+0", 8, 1),
            ("4+7+0", 12, 1),
        ];

        for (name, channels, lfe) in expected {
            let layout = get_layout(name).unwrap();
            assert_eq!(layout.num_channels(), channels, "{name}");
            assert_eq!(layout.is_lfe().iter().filter(|&&l| l).count(), lfe, "{name}");
            assert!(layout.check_positions().is_empty(), "{name}");
        }
    }

    #[test]
    fn test_unknown_layout() {
        assert!(get_layout("7+7+7").is_err());
    }
}
