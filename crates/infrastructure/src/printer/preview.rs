use domain::job::{Alignment, FontSize, PrintElement};

const CUT_MARK: &str = "- - ✂ - -";
const MIN_COLUMNS: usize = 16;

/// Renders print jobs as the plain text a receipt printer would produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewRenderer {
    columns: usize,
    first_rank: Option<(u32, u32)>,
}

impl PreviewRenderer {
    /// 58 mm paper prints 32 columns, 80 mm prints 48. Other widths scale
    /// from 58 mm.
    pub fn for_page_width(width_mm: u32) -> Self {
        let columns = match width_mm {
            58 => 32,
            80 => 48,
            w => ((w as usize) * 32 / 58).max(MIN_COLUMNS),
        };
        Self {
            columns,
            first_rank: None,
        }
    }

    /// Caps the first column of 3- and 4-column text lists.
    pub fn with_first_rank(mut self, three_columns: u32, four_columns: u32) -> Self {
        self.first_rank = Some((three_columns, four_columns));
        self
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn render(&self, elements: &[PrintElement]) -> Vec<String> {
        let mut lines = Vec::new();
        for element in elements {
            self.render_element(element, &mut lines);
        }
        lines
    }

    pub fn render_to_string(&self, elements: &[PrintElement]) -> String {
        let mut out = self.render(elements).join("\n");
        out.push('\n');
        out
    }

    fn render_element(&self, element: &PrintElement, lines: &mut Vec<String>) {
        match element {
            PrintElement::Text {
                content,
                font,
                align,
            } => {
                let text = styled(content, *font);
                self.push_wrapped(&text, *align, lines);
            }
            PrintElement::TextList {
                items,
                is_title,
                font,
            } => {
                let font = font.unwrap_or_default();
                let cells: Vec<String> = items
                    .iter()
                    .map(|item| {
                        if *is_title {
                            item.to_uppercase()
                        } else {
                            styled(item, font)
                        }
                    })
                    .collect();
                lines.push(self.columns_line(&cells));
            }
            PrintElement::BarCode { content, align, .. } => {
                lines.push(self.aligned(&format!("|| {} ||", content), *align));
            }
            PrintElement::QrCode {
                content,
                size,
                align,
            } => {
                self.push_wrapped(&format!("[QR {}] {}", size, content), *align, lines);
            }
            PrintElement::Image {
                max_width, align, ..
            } => {
                lines.push(self.aligned(&format!("[IMAGE {} px]", max_width), *align));
            }
            PrintElement::SeparatorLine => lines.push("-".repeat(self.columns)),
            PrintElement::SpaceLine => lines.push(String::new()),
            PrintElement::Footer { content } => {
                self.push_wrapped(content, Alignment::Center, lines);
            }
            PrintElement::CutPage => lines.push(self.aligned(CUT_MARK, Alignment::Center)),
        }
    }

    fn push_wrapped(&self, text: &str, align: Alignment, lines: &mut Vec<String>) {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            return;
        }
        for chunk in chars.chunks(self.columns) {
            let chunk: String = chunk.iter().collect();
            lines.push(self.aligned(&chunk, align));
        }
    }

    fn aligned(&self, text: &str, align: Alignment) -> String {
        let len = text.chars().count();
        if len >= self.columns {
            return text.to_string();
        }
        let pad = self.columns - len;
        match align {
            Alignment::Left => text.to_string(),
            Alignment::Center => format!("{}{}", " ".repeat(pad / 2), text)
                .trim_end()
                .to_string(),
            Alignment::Right => format!("{}{}", " ".repeat(pad), text),
        }
    }

    /// First cell left-aligned, the rest right-aligned, line split evenly
    /// unless a first-rank cap applies.
    fn columns_line(&self, cells: &[String]) -> String {
        if cells.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(cells.len());
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            let cell: String = cell.chars().take(width).collect();
            if i == 0 {
                line.push_str(&format!("{:<width$}", cell, width = width));
            } else {
                line.push_str(&format!("{:>width$}", cell, width = width));
            }
        }
        line.trim_end().to_string()
    }

    fn column_widths(&self, count: usize) -> Vec<usize> {
        let cap = match (count, self.first_rank) {
            (3, Some((three, _))) => Some(three as usize),
            (4, Some((_, four))) => Some(four as usize),
            _ => None,
        };

        match cap {
            Some(first) if first < self.columns => {
                let rest = (self.columns - first) / (count - 1);
                let mut widths = vec![rest; count];
                widths[0] = first;
                widths
            }
            _ => vec![(self.columns / count).max(1); count],
        }
    }
}

fn styled(text: &str, font: FontSize) -> String {
    if font.is_big() {
        text.to_uppercase()
    } else {
        text.to_string()
    }
}
