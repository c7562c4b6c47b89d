use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{
    Alignment, DEFAULT_MAX_WIDTH, DEFAULT_QR_SIZE, FontSize, InfoType, JobError, PrintElement,
};

/// Flat record shape consumed by the native print engine.
///
/// Key names (including the `aligmentType` spelling) are fixed by the engine.
/// Absent fields are omitted from the JSON, never written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(rename = "infoType")]
    pub info_type: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(rename = "textArray", default, skip_serializing_if = "Option::is_none")]
    pub text_array: Option<Vec<String>>,

    /// Written as `0`/`1`; read as either a number or a boolean.
    #[serde(
        rename = "isTitle",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_title_flag",
        deserialize_with = "deserialize_title_flag"
    )]
    pub is_title: Option<bool>,

    #[serde(rename = "aligmentType", default, skip_serializing_if = "Option::is_none")]
    pub alignment_type: Option<u8>,

    #[serde(rename = "fontType", default, skip_serializing_if = "Option::is_none")]
    pub font_type: Option<u8>,

    #[serde(rename = "maxWidth", default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,

    #[serde(rename = "qrCodeSize", default, skip_serializing_if = "Option::is_none")]
    pub qr_code_size: Option<u32>,
}

fn serialize_title_flag<S>(flag: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match flag {
        Some(flag) => serializer.serialize_u8(u8::from(*flag)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_title_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TitleFlag {
        Flag(bool),
        Number(u64),
    }

    let opt: Option<TitleFlag> = Option::deserialize(deserializer)?;
    Ok(opt.map(|flag| match flag {
        TitleFlag::Flag(b) => b,
        TitleFlag::Number(n) => n != 0,
    }))
}

impl WireRecord {
    fn tagged(info_type: InfoType) -> Self {
        Self {
            info_type: info_type.code(),
            ..Default::default()
        }
    }

    fn require_text(&mut self, kind: &str) -> Result<String, JobError> {
        self.text
            .take()
            .ok_or_else(|| JobError::MalformedRecord(format!("{kind} record without `text`")))
    }

    fn alignment(&self) -> Result<Alignment, JobError> {
        match self.alignment_type {
            None => Ok(Alignment::default()),
            Some(code) => Alignment::from_code(code).ok_or_else(|| {
                JobError::MalformedRecord(format!("unknown aligmentType {code}"))
            }),
        }
    }

    fn font(&self) -> Result<Option<FontSize>, JobError> {
        match self.font_type {
            None => Ok(None),
            Some(code) => FontSize::from_code(code)
                .map(Some)
                .ok_or_else(|| JobError::MalformedRecord(format!("unknown fontType {code}"))),
        }
    }
}

impl From<PrintElement> for WireRecord {
    fn from(element: PrintElement) -> Self {
        let mut record = Self::tagged(element.info_type());
        match element {
            PrintElement::Text {
                content,
                font,
                align,
            } => {
                record.text = Some(content);
                record.alignment_type = Some(align.code());
                record.font_type = Some(font.code());
            }
            PrintElement::TextList {
                items,
                is_title,
                font,
            } => {
                record.text_array = Some(items);
                record.is_title = Some(is_title);
                record.font_type = font.map(FontSize::code);
            }
            PrintElement::BarCode {
                content,
                max_width,
                align,
            } => {
                record.text = Some(content);
                record.alignment_type = Some(align.code());
                record.max_width = Some(max_width);
            }
            PrintElement::QrCode {
                content,
                size,
                align,
            } => {
                record.text = Some(content);
                record.alignment_type = Some(align.code());
                record.qr_code_size = Some(size);
            }
            PrintElement::Image {
                base64_data,
                max_width,
                align,
            } => {
                record.text = Some(base64_data);
                record.alignment_type = Some(align.code());
                record.max_width = Some(max_width);
            }
            PrintElement::Footer { content } => {
                record.text = Some(content);
            }
            PrintElement::SeparatorLine | PrintElement::SpaceLine | PrintElement::CutPage => {}
        }
        record
    }
}

impl TryFrom<WireRecord> for PrintElement {
    type Error = JobError;

    fn try_from(mut record: WireRecord) -> Result<Self, Self::Error> {
        let info_type = InfoType::from_code(record.info_type).ok_or_else(|| {
            JobError::MalformedRecord(format!("unknown infoType {}", record.info_type))
        })?;

        let element = match info_type {
            InfoType::Text => Self::Text {
                font: record.font()?.unwrap_or_default(),
                align: record.alignment()?,
                content: record.require_text("text")?,
            },
            InfoType::TextList => Self::TextList {
                font: record.font()?,
                is_title: record.is_title.unwrap_or(false),
                items: record.text_array.take().ok_or_else(|| {
                    JobError::MalformedRecord("textList record without `textArray`".to_string())
                })?,
            },
            InfoType::BarCode => Self::BarCode {
                max_width: record.max_width.unwrap_or(DEFAULT_MAX_WIDTH),
                align: record.alignment()?,
                content: record.require_text("barCode")?,
            },
            InfoType::QrCode => Self::QrCode {
                size: record.qr_code_size.unwrap_or(DEFAULT_QR_SIZE),
                align: record.alignment()?,
                content: record.require_text("qrCode")?,
            },
            InfoType::Image => Self::Image {
                max_width: record.max_width.unwrap_or(DEFAULT_MAX_WIDTH),
                align: record.alignment()?,
                base64_data: record.require_text("image")?,
            },
            InfoType::SeparatorLine => Self::SeparatorLine,
            InfoType::SpaceLine => Self::SpaceLine,
            InfoType::CutPage => Self::CutPage,
            InfoType::Footer => Self::Footer {
                content: record.require_text("footer")?,
            },
        };
        Ok(element)
    }
}

/// Serializes elements, in order, into the engine's JSON array.
pub fn encode_message(elements: &[PrintElement]) -> Result<String, JobError> {
    serde_json::to_string(elements).map_err(|e| JobError::Encoding(e.to_string()))
}

/// Parses an engine JSON array back into elements.
pub fn decode_message(message: &str) -> Result<Vec<PrintElement>, JobError> {
    serde_json::from_str(message).map_err(|e| JobError::Decoding(e.to_string()))
}
