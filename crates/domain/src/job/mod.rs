//! Print job document model
//!
//! A [`Job`] is the ordered list of [`PrintElement`]s that ends up on one
//! physical receipt. Element order is print order; nothing here reorders or
//! removes elements once they are appended.

mod wire;

pub use wire::{WireRecord, decode_message, encode_message};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default width (in printer dots) for barcodes and images.
pub const DEFAULT_MAX_WIDTH: u32 = 300;

/// Default QR code module size. The renderer documents 1-16 as valid.
pub const DEFAULT_QR_SIZE: u32 = 12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobError {
    #[error("Malformed print element: {0}")]
    MalformedRecord(String),

    #[error("Failed to encode print job: {0}")]
    Encoding(String),

    #[error("Failed to decode print job: {0}")]
    Decoding(String),
}

/// Numeric tag identifying an element kind on the wire (`infoType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InfoType {
    Text = 0,
    TextList = 1,
    BarCode = 2,
    QrCode = 3,
    Image = 4,
    SeparatorLine = 5,
    SpaceLine = 6,
    Footer = 7,
    CutPage = 8,
}

impl InfoType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Text),
            1 => Some(Self::TextList),
            2 => Some(Self::BarCode),
            3 => Some(Self::QrCode),
            4 => Some(Self::Image),
            5 => Some(Self::SeparatorLine),
            6 => Some(Self::SpaceLine),
            7 => Some(Self::Footer),
            8 => Some(Self::CutPage),
            _ => None,
        }
    }
}

/// Font scale understood by the print engine, smallest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FontSize {
    #[default]
    Small = 0,
    Medium = 1,
    Big = 2,
    Big3 = 3,
    Big4 = 4,
    Big5 = 5,
    Big6 = 6,
    Big7 = 7,
    Big8 = 8,
}

impl FontSize {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Small),
            1 => Some(Self::Medium),
            2 => Some(Self::Big),
            3 => Some(Self::Big3),
            4 => Some(Self::Big4),
            5 => Some(Self::Big5),
            6 => Some(Self::Big6),
            7 => Some(Self::Big7),
            8 => Some(Self::Big8),
            _ => None,
        }
    }

    /// Anything from `Big` upwards.
    pub fn is_big(self) -> bool {
        self >= Self::Big
    }
}

impl PartialOrd for FontSize {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FontSize {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code().cmp(&other.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Alignment {
    Left = 0,
    #[default]
    Center = 1,
    Right = 2,
}

impl Alignment {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Center),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

/// One printable unit of a receipt.
///
/// Serializes to and from the engine's flat record shape (see [`WireRecord`]),
/// so a `Vec<PrintElement>` is directly the JSON array the sink consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireRecord", try_from = "WireRecord")]
pub enum PrintElement {
    Text {
        content: String,
        font: FontSize,
        align: Alignment,
    },
    TextList {
        items: Vec<String>,
        is_title: bool,
        /// `None` leaves the font to the renderer, which is not the same as `Small`.
        font: Option<FontSize>,
    },
    BarCode {
        content: String,
        max_width: u32,
        align: Alignment,
    },
    QrCode {
        content: String,
        /// Passed through as given; the renderer owns the 1-16 range.
        size: u32,
        align: Alignment,
    },
    Image {
        base64_data: String,
        max_width: u32,
        align: Alignment,
    },
    SeparatorLine,
    SpaceLine,
    CutPage,
    Footer {
        content: String,
    },
}

impl PrintElement {
    pub fn info_type(&self) -> InfoType {
        match self {
            Self::Text { .. } => InfoType::Text,
            Self::TextList { .. } => InfoType::TextList,
            Self::BarCode { .. } => InfoType::BarCode,
            Self::QrCode { .. } => InfoType::QrCode,
            Self::Image { .. } => InfoType::Image,
            Self::SeparatorLine => InfoType::SeparatorLine,
            Self::SpaceLine => InfoType::SpaceLine,
            Self::CutPage => InfoType::CutPage,
            Self::Footer { .. } => InfoType::Footer,
        }
    }
}

/// Ordered, append-only collection of elements for one receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    elements: Vec<PrintElement>,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: PrintElement) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PrintElement] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PrintElement> {
        self.elements.iter()
    }

    pub fn into_elements(self) -> Vec<PrintElement> {
        self.elements
    }

    /// Encodes the job as the JSON array handed to the print engine.
    pub fn to_message(&self) -> Result<String, JobError> {
        encode_message(&self.elements)
    }

    /// Parses a message produced by [`Job::to_message`] (or by any other
    /// producer of the same wire format).
    pub fn from_message(message: &str) -> Result<Self, JobError> {
        Ok(Self {
            elements: decode_message(message)?,
        })
    }
}

impl From<Vec<PrintElement>> for Job {
    fn from(elements: Vec<PrintElement>) -> Self {
        Self { elements }
    }
}

impl<'a> IntoIterator for &'a Job {
    type Item = &'a PrintElement;
    type IntoIter = std::slice::Iter<'a, PrintElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
