//! Region affiliation tags
//!
//! Regions act as teams: entities sharing a region never damage each other.
//! Labels and colors are static display data mirrored by every client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Team/affiliation tag carried by every tank and captured by every bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Taipei,
    NewTaipei,
    Taoyuan,
    Hsinchu,
    Miaoli,
    Taichung,
    Changhua,
    Nantou,
    Yunlin,
    Chiayi,
    Tainan,
    Kaohsiung,
    Pingtung,
    Keelung,
    Yilan,
    Hualien,
    Taitung,
    Penghu,
    Kinmen,
}

impl Region {
    /// All regions, in score-table order
    pub const ALL: [Region; 19] = [
        Region::Taipei,
        Region::NewTaipei,
        Region::Taoyuan,
        Region::Hsinchu,
        Region::Miaoli,
        Region::Taichung,
        Region::Changhua,
        Region::Nantou,
        Region::Yunlin,
        Region::Chiayi,
        Region::Tainan,
        Region::Kaohsiung,
        Region::Pingtung,
        Region::Keelung,
        Region::Yilan,
        Region::Hualien,
        Region::Taitung,
        Region::Penghu,
        Region::Kinmen,
    ];

    /// Display label (zh-TW)
    pub fn label(self) -> &'static str {
        match self {
            Region::Taipei => "台北市",
            Region::NewTaipei => "新北市",
            Region::Taoyuan => "桃園市",
            Region::Hsinchu => "新竹市",
            Region::Miaoli => "苗栗縣",
            Region::Taichung => "台中市",
            Region::Changhua => "彰化縣",
            Region::Nantou => "南投縣",
            Region::Yunlin => "雲林縣",
            Region::Chiayi => "嘉義市",
            Region::Tainan => "台南市",
            Region::Kaohsiung => "高雄市",
            Region::Pingtung => "屏東縣",
            Region::Keelung => "基隆市",
            Region::Yilan => "宜蘭縣",
            Region::Hualien => "花蓮縣",
            Region::Taitung => "台東縣",
            Region::Penghu => "澎湖縣",
            Region::Kinmen => "金門縣",
        }
    }

    /// Display color as a CSS hex string
    pub fn color(self) -> &'static str {
        match self {
            Region::Taipei => "#22c55e",
            Region::NewTaipei => "#86efac",
            Region::Taoyuan => "#14b8a6",
            Region::Hsinchu => "#06b6d4",
            Region::Miaoli => "#a3e635",
            Region::Taichung => "#3b82f6",
            Region::Changhua => "#60a5fa",
            Region::Nantou => "#818cf8",
            Region::Yunlin => "#a78bfa",
            Region::Chiayi => "#6366f1",
            Region::Tainan => "#f59e0b",
            Region::Kaohsiung => "#ef4444",
            Region::Pingtung => "#be123c",
            Region::Keelung => "#a855f7",
            Region::Yilan => "#ec4899",
            Region::Hualien => "#10b981",
            Region::Taitung => "#f97316",
            Region::Penghu => "#0ea5e9",
            Region::Kinmen => "#eab308",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .iter()
            .copied()
            .find(|r| format!("{:?}", r).eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

/// Parse error for region names
#[derive(Debug, thiserror::Error)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_regions_have_distinct_colors() {
        let mut colors: Vec<&str> = Region::ALL.iter().map(|r| r.color()).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), Region::ALL.len());
    }

    #[test]
    fn parses_case_insensitive() {
        assert_eq!("taipei".parse::<Region>().unwrap(), Region::Taipei);
        assert_eq!("NewTaipei".parse::<Region>().unwrap(), Region::NewTaipei);
        assert!("Atlantis".parse::<Region>().is_err());
    }
}
