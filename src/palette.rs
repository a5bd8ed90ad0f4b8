//! Fixed 20-color palette and the per-call color assignment policies.
//!
//! Layers carry an opaque palette token (`category20b-N`) that the
//! presentation layer resolves; each entry also records the hex value it
//! resolves to so hosts without a CSS engine can render directly.

use serde::{Deserialize, Serialize};

/// One palette entry: opaque token plus its resolved hex color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaletteColor {
    pub token: &'static str,
    pub hex: &'static str,
}

impl PaletteColor {
    /// Look up a palette entry by its token.
    pub fn from_token(token: &str) -> Option<PaletteColor> {
        COLOR_PALETTE.iter().copied().find(|c| c.token == token)
    }
}

/// Blue, orange, green, purple and grey ramps, four shades each.
pub const COLOR_PALETTE: [PaletteColor; 20] = [
    PaletteColor { token: "category20b-1", hex: "#3182bd" },
    PaletteColor { token: "category20b-2", hex: "#6baed6" },
    PaletteColor { token: "category20b-3", hex: "#9ecae1" },
    PaletteColor { token: "category20b-4", hex: "#c6dbef" },
    PaletteColor { token: "category20b-5", hex: "#e6550d" },
    PaletteColor { token: "category20b-6", hex: "#fd8d3c" },
    PaletteColor { token: "category20b-7", hex: "#fdae6b" },
    PaletteColor { token: "category20b-8", hex: "#fdd0a2" },
    PaletteColor { token: "category20b-9", hex: "#31a354" },
    PaletteColor { token: "category20b-10", hex: "#74c476" },
    PaletteColor { token: "category20b-11", hex: "#a1d99b" },
    PaletteColor { token: "category20b-12", hex: "#c7e9c0" },
    PaletteColor { token: "category20b-13", hex: "#756bb1" },
    PaletteColor { token: "category20b-14", hex: "#9e9ac8" },
    PaletteColor { token: "category20b-15", hex: "#bcbddc" },
    PaletteColor { token: "category20b-16", hex: "#dadaeb" },
    PaletteColor { token: "category20b-17", hex: "#636363" },
    PaletteColor { token: "category20b-18", hex: "#969696" },
    PaletteColor { token: "category20b-19", hex: "#bdbdbd" },
    PaletteColor { token: "category20b-20", hex: "#d9d9d9" },
];

/// Color given to features before the store assigns the final one.
pub const PLACEHOLDER_COLOR: PaletteColor = COLOR_PALETTE[0];

/// How entity ids map to palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorPolicy {
    /// `palette[rank mod 20]` over the sorted ids of one ingestion call.
    /// Colors restart for every load, so they are not stable across days.
    #[default]
    DailyRoundRobin,
    /// `palette[hash(id) mod 20]`; stable across sessions, may collide.
    StableHash,
}

/// Palette entry for a 0-based rank, wrapping every 20.
#[inline]
pub fn color_for_rank(rank: usize) -> PaletteColor {
    COLOR_PALETTE[rank % COLOR_PALETTE.len()]
}

/// Stable palette entry for an id, independent of what else is loaded.
pub fn stable_color_for_id(id: &str) -> PaletteColor {
    // 32-bit `h * 31 + c` over UTF-16 code units
    let hash = id
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32));
    COLOR_PALETTE[(hash.unsigned_abs() as usize) % COLOR_PALETTE.len()]
}

/// Sort and dedupe `ids`, then assign each a color under `policy`.
///
/// With [`ColorPolicy::DailyRoundRobin`] the k-th id in sorted order gets
/// `palette[k mod 20]`, so up to 20 ids always receive distinct colors.
///
/// # Example
///
/// ```rust
/// use care_layers::{assign_colors, ColorPolicy, COLOR_PALETTE};
///
/// let assigned = assign_colors(["B", "A", "C", "A"], ColorPolicy::DailyRoundRobin);
/// let ids: Vec<&str> = assigned.iter().map(|(id, _)| id.as_str()).collect();
/// assert_eq!(ids, ["A", "B", "C"]);
/// assert_eq!(assigned[1].1, COLOR_PALETTE[1]);
/// ```
pub fn assign_colors<I, S>(ids: I, policy: ColorPolicy) -> Vec<(String, PaletteColor)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
    sorted.sort();
    sorted.dedup();

    sorted
        .into_iter()
        .enumerate()
        .map(|(rank, id)| {
            let color = match policy {
                ColorPolicy::DailyRoundRobin => color_for_rank(rank),
                ColorPolicy::StableHash => stable_color_for_id(&id),
            };
            (id, color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_palette_has_twenty_unique_tokens() {
        let tokens: HashSet<_> = COLOR_PALETTE.iter().map(|c| c.token).collect();
        assert_eq!(tokens.len(), 20);
    }

    #[test]
    fn test_round_robin_bijection_up_to_twenty() {
        let ids: Vec<String> = (0..20).map(|i| format!("P{:02}", i)).collect();
        let assigned = assign_colors(&ids, ColorPolicy::DailyRoundRobin);
        let colors: HashSet<_> = assigned.iter().map(|(_, c)| c.token).collect();
        assert_eq!(colors.len(), 20);
        for (k, (_, color)) in assigned.iter().enumerate() {
            assert_eq!(*color, COLOR_PALETTE[k]);
        }
    }

    #[test]
    fn test_round_robin_wraps_after_twenty() {
        let ids: Vec<String> = (0..45).map(|i| format!("P{:02}", i)).collect();
        let assigned = assign_colors(&ids, ColorPolicy::DailyRoundRobin);
        assert_eq!(assigned[20].1, COLOR_PALETTE[0]);
        assert_eq!(assigned[41].1, COLOR_PALETTE[1]);
        assert_eq!(assigned[44].1, assigned[24].1);
    }

    #[test]
    fn test_assignment_uses_sorted_order() {
        let assigned = assign_colors(["1140703", "1140701", "1140702"], ColorPolicy::DailyRoundRobin);
        assert_eq!(assigned[0], ("1140701".to_string(), COLOR_PALETTE[0]));
        assert_eq!(assigned[2], ("1140703".to_string(), COLOR_PALETTE[2]));
    }

    #[test]
    fn test_stable_hash_is_deterministic() {
        let a = stable_color_for_id("A123456789");
        let b = stable_color_for_id("A123456789");
        assert_eq!(a, b);

        // Independent of the other ids in the call
        let alone = assign_colors(["A123456789"], ColorPolicy::StableHash);
        let crowded = assign_colors(["0", "A123456789", "Z"], ColorPolicy::StableHash);
        assert_eq!(alone[0].1, crowded[1].1);
    }

    #[test]
    fn test_from_token() {
        assert_eq!(PaletteColor::from_token("category20b-5").unwrap().hex, "#e6550d");
        assert!(PaletteColor::from_token("nope").is_none());
    }
}
