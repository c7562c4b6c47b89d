use domain::job::{Alignment, FontSize, Job, JobError, PrintElement};

/// Accumulates the elements of one print job, in append order.
///
/// Each logical job owns its builder (or is separated from the previous job
/// by [`JobBuilder::reset`] / a drain). Appends never fail; the values are
/// handed to the print engine as given.
#[derive(Debug, Default)]
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text line. Engine defaults are `Alignment::Center` and `FontSize::Small`.
    pub fn append_text(
        &mut self,
        content: impl Into<String>,
        align: Alignment,
        font: FontSize,
    ) -> &mut Self {
        self.append(PrintElement::Text {
            content: content.into(),
            font,
            align,
        })
    }

    /// Row of columns. With `font: None` the record carries no font and the
    /// renderer picks its own.
    pub fn append_text_list<I, S>(
        &mut self,
        items: I,
        is_title: bool,
        font: Option<FontSize>,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.append(PrintElement::TextList {
            items: items.into_iter().map(Into::into).collect(),
            is_title,
            font,
        })
    }

    pub fn append_bar_code(
        &mut self,
        content: impl Into<String>,
        max_width: u32,
        align: Alignment,
    ) -> &mut Self {
        self.append(PrintElement::BarCode {
            content: content.into(),
            max_width,
            align,
        })
    }

    /// QR code. `size` is not clamped to 1-16; out-of-range values are left
    /// for the renderer to handle.
    pub fn append_qr_code(
        &mut self,
        content: impl Into<String>,
        size: u32,
        align: Alignment,
    ) -> &mut Self {
        self.append(PrintElement::QrCode {
            content: content.into(),
            size,
            align,
        })
    }

    pub fn append_image(
        &mut self,
        base64_data: impl Into<String>,
        max_width: u32,
        align: Alignment,
    ) -> &mut Self {
        self.append(PrintElement::Image {
            base64_data: base64_data.into(),
            max_width,
            align,
        })
    }

    pub fn append_separator_line(&mut self) -> &mut Self {
        self.append(PrintElement::SeparatorLine)
    }

    pub fn append_space_line(&mut self) -> &mut Self {
        self.append(PrintElement::SpaceLine)
    }

    pub fn append_cut_page(&mut self) -> &mut Self {
        self.append(PrintElement::CutPage)
    }

    pub fn append_footer(&mut self, content: impl Into<String>) -> &mut Self {
        self.append(PrintElement::Footer {
            content: content.into(),
        })
    }

    pub fn append(&mut self, element: PrintElement) -> &mut Self {
        self.job.push(element);
        self
    }

    /// Discards everything appended so far.
    pub fn reset(&mut self) {
        if !self.job.is_empty() {
            tracing::debug!(elements = self.job.len(), "Print job discarded");
        }
        self.job = Job::new();
    }

    pub fn len(&self) -> usize {
        self.job.len()
    }

    pub fn is_empty(&self) -> bool {
        self.job.is_empty()
    }

    pub fn elements(&self) -> &[PrintElement] {
        self.job.elements()
    }

    /// Moves the accumulated job out, leaving the builder empty.
    pub fn drain(&mut self) -> Job {
        let job = std::mem::take(&mut self.job);
        tracing::debug!(elements = job.len(), "📦 Print job drained. Builder cleared.");
        job
    }

    /// Drains the builder and encodes the job as the engine's JSON array.
    ///
    /// The builder is empty afterwards whatever the outcome, so a second call
    /// without new appends yields `[]`.
    pub fn drain_to_message(&mut self) -> Result<String, JobError> {
        self.drain().to_message()
    }
}
