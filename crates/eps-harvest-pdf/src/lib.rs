use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use pdf_extract::{
    ColorSpace, Document, MediaBox, OutputDev, OutputError, PathOp, Transform,
};

use eps_harvest_core::{BackendError, Glyph, PageLayout, PdfBackend, Ruling};

/// pdf-extract based implementation of [`PdfBackend`].
///
/// Records every positioned character and every stroked or filled straight
/// path segment, in top-left page coordinates. `pdf_extract` panics on some
/// malformed input; those panics are caught here and reported as
/// [`BackendError::Panicked`] so a single bad file cannot take down a batch.
pub struct PdfExtractBackend {
    /// Password tried on encrypted documents. Most brokerage PDFs are
    /// "encrypted" with an empty user password only to restrict copying.
    password: String,
}

impl Default for PdfExtractBackend {
    fn default() -> Self {
        Self {
            password: String::new(),
        }
    }
}

impl PdfExtractBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    fn load(&self, path: &Path) -> Result<Vec<PageLayout>, BackendError> {
        let mut document =
            Document::load(path).map_err(|e| BackendError::OpenError(e.to_string()))?;

        if document.is_encrypted() {
            document
                .decrypt(self.password.as_bytes())
                .map_err(|e| BackendError::OpenError(format!("cannot decrypt: {}", e)))?;
        }

        let mut collector = LayoutCollector::default();
        pdf_extract::output_doc(&document, &mut collector)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        Ok(collector.finish())
    }
}

impl PdfBackend for PdfExtractBackend {
    fn extract_layout(&self, path: &Path) -> Result<Vec<PageLayout>, BackendError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.load(path))) {
            Ok(result) => {
                if let Ok(pages) = &result {
                    tracing::debug!(
                        path = %path.display(),
                        pages = pages.len(),
                        glyphs = pages.iter().map(|p| p.glyphs.len()).sum::<usize>(),
                        "layout extracted"
                    );
                }
                result
            }
            Err(payload) => Err(BackendError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Share of the font size above the baseline.
const ASCENT: f64 = 0.8;
/// Share of the font size below the baseline.
const DESCENT: f64 = 0.2;

#[derive(Default)]
struct LayoutCollector {
    pages: Vec<PageLayout>,
    current: Option<PageLayout>,
    /// Media box height, used to flip y.
    flip: f64,
}

impl LayoutCollector {
    fn finish(mut self) -> Vec<PageLayout> {
        self.pages.extend(self.current.take());
        self.pages
    }

    fn to_page(&self, ctm: &Transform, x: f64, y: f64) -> (f64, f64) {
        let dx = x * ctm.m11 + y * ctm.m21 + ctm.m31;
        let dy = x * ctm.m12 + y * ctm.m22 + ctm.m32;
        (dx, self.flip - dy)
    }

    fn add_path(&mut self, ctm: &Transform, path: &pdf_extract::Path) {
        let mut segments = Vec::new();
        let mut start: Option<(f64, f64)> = None;
        let mut cursor: Option<(f64, f64)> = None;

        for op in &path.ops {
            match *op {
                PathOp::MoveTo(x, y) => {
                    let p = self.to_page(ctm, x, y);
                    start = Some(p);
                    cursor = Some(p);
                }
                PathOp::LineTo(x, y) => {
                    let p = self.to_page(ctm, x, y);
                    if let Some(from) = cursor {
                        segments.push((from, p));
                    }
                    cursor = Some(p);
                }
                PathOp::CurveTo(_, _, _, _, x, y) => {
                    cursor = Some(self.to_page(ctm, x, y));
                }
                PathOp::Rect(x, y, w, h) => {
                    let a = self.to_page(ctm, x, y);
                    let b = self.to_page(ctm, x + w, y);
                    let c = self.to_page(ctm, x + w, y + h);
                    let d = self.to_page(ctm, x, y + h);
                    segments.extend([(a, b), (b, c), (c, d), (d, a)]);
                    start = Some(a);
                    cursor = Some(a);
                }
                PathOp::Close => {
                    if let (Some(from), Some(to)) = (cursor, start) {
                        segments.push((from, to));
                    }
                    cursor = start;
                }
            }
        }

        if let Some(page) = self.current.as_mut() {
            page.rulings.extend(
                segments
                    .into_iter()
                    .map(|((xa, ya), (xb, yb))| Ruling::from_points(xa, ya, xb, yb)),
            );
        }
    }
}

impl OutputDev for LayoutCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.pages.extend(self.current.take());
        self.flip = media_box.ury - media_box.lly;
        self.current = Some(PageLayout {
            number: page_num as usize,
            width: media_box.urx - media_box.llx,
            height: media_box.ury - media_box.lly,
            glyphs: Vec::new(),
            rulings: Vec::new(),
        });
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.pages.extend(self.current.take());
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let sx = font_size * trm.m11 + font_size * trm.m21;
        let sy = font_size * trm.m12 + font_size * trm.m22;
        let size = (sx * sy).abs().sqrt();
        let x = trm.m31;
        let baseline = self.flip - trm.m32;

        if let Some(page) = self.current.as_mut() {
            page.glyphs.push(Glyph {
                text: char.to_string(),
                x0: x,
                x1: x + width * size,
                top: baseline - ASCENT * size,
                bottom: baseline + DESCENT * size,
            });
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn stroke(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &pdf_extract::Path,
    ) -> Result<(), OutputError> {
        self.add_path(ctm, path);
        Ok(())
    }

    fn fill(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &pdf_extract::Path,
    ) -> Result<(), OutputError> {
        self.add_path(ctm, path);
        Ok(())
    }
}
