use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr};

/// Release quality tier
///
/// The discriminants are the persisted values. Ordering follows the
/// discriminant, so `Unknown` sorts above every real tier and must be checked
/// explicitly rather than compared against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    FromRepr,
)]
#[repr(i32)]
pub enum Quality {
    #[strum(to_string = "N/A")]
    None = 0,
    #[strum(to_string = "SD TV")]
    SdTv = 1,
    #[strum(to_string = "SD DVD")]
    SdDvd = 1 << 1,
    #[strum(to_string = "720p HDTV")]
    HdTv = 1 << 2,
    #[strum(to_string = "RawHD TV")]
    RawHdTv = 1 << 3,
    #[strum(to_string = "1080p HDTV")]
    FullHdTv = 1 << 4,
    #[strum(to_string = "720p WEB-DL")]
    HdWebDl = 1 << 5,
    #[strum(to_string = "1080p WEB-DL")]
    FullHdWebDl = 1 << 6,
    #[strum(to_string = "720p BluRay")]
    HdBluRay = 1 << 7,
    #[strum(to_string = "1080p BluRay")]
    FullHdBluRay = 1 << 8,
    #[strum(to_string = "4K UHD TV")]
    Uhd4kTv = 1 << 9,
    #[strum(to_string = "4K UHD WEB-DL")]
    Uhd4kWebDl = 1 << 10,
    #[strum(to_string = "4K UHD BluRay")]
    Uhd4kBluRay = 1 << 11,
    #[strum(to_string = "Unknown")]
    Unknown = 1 << 15,
}

impl Quality {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether the parser resolved an actual tier
    pub fn is_known(self) -> bool {
        self != Quality::Unknown
    }
}

impl TryFrom<i32> for Quality {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Quality::from_repr(value).ok_or(value)
    }
}
