use domain::job::{Alignment, FontSize};
use serde::{Deserialize, Serialize};

use super::builder::JobBuilder;

const DEFAULT_STORE_NAME: &str = "Store Receipt";
const DEFAULT_FOOTER: [&str; 2] = ["Thank you for your business!", "Visit us again soon!"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub price: f64,
}

/// Store receipt, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store_address: Option<String>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub total: Option<f64>,
    /// Closing lines. Empty means the default thank-you lines.
    #[serde(default)]
    pub footer_lines: Vec<String>,
}

impl ReceiptData {
    /// Appends the whole receipt to `builder`, ending with a paper cut.
    pub fn compose(&self, builder: &mut JobBuilder) {
        builder.append_text(
            self.store_name.as_deref().unwrap_or(DEFAULT_STORE_NAME),
            Alignment::Center,
            FontSize::Big,
        );
        if let Some(address) = self.store_address.as_deref().filter(|a| !a.is_empty()) {
            builder.append_text(address, Alignment::Center, FontSize::Small);
        }

        builder.append_separator_line();
        for item in &self.items {
            builder.append_text(item_line(item), Alignment::Left, FontSize::Small);
        }
        builder.append_separator_line();

        // A zero total is left off, like a missing one
        if let Some(total) = self.total.filter(|t| *t != 0.0) {
            builder.append_text(
                format!("TOTAL: {:.2}", total),
                Alignment::Right,
                FontSize::Medium,
            );
        }

        if self.footer_lines.is_empty() {
            for line in DEFAULT_FOOTER {
                builder.append_text(line, Alignment::Center, FontSize::Small);
            }
        } else {
            for line in &self.footer_lines {
                builder.append_text(line.as_str(), Alignment::Center, FontSize::Small);
            }
        }

        builder.append_cut_page();
    }
}

/// "Name                    12.50": name padded to 20, price right-aligned in 8.
fn item_line(item: &ReceiptItem) -> String {
    format!("{:<20} {:>8.2}", item.name, item.price)
}
