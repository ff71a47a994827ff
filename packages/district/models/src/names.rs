//! Canonical Seoul district names.
//!
//! Every join in the pipeline is keyed on these exact spellings. Source
//! names are trimmed and compared for exact equality; there is no fuzzy
//! matching.

/// The 25 autonomous districts (자치구) of Seoul, in 가나다 order.
pub const SEOUL_DISTRICTS: &[&str] = &[
    "강남구",
    "강동구",
    "강북구",
    "강서구",
    "관악구",
    "광진구",
    "구로구",
    "금천구",
    "노원구",
    "도봉구",
    "동대문구",
    "동작구",
    "마포구",
    "서대문구",
    "서초구",
    "성동구",
    "성북구",
    "송파구",
    "양천구",
    "영등포구",
    "용산구",
    "은평구",
    "종로구",
    "중구",
    "중랑구",
];

/// Returns `true` if `name` is one of the canonical Seoul district names.
#[must_use]
pub fn is_seoul_district(name: &str) -> bool {
    SEOUL_DISTRICTS.contains(&name)
}
