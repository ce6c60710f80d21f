//! The extraction pipeline: documents in, named WebP files out.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PdfpixError, Result};
use crate::imaging;
use crate::models::{
    CollisionPolicy, DocumentReport, FailedDocument, ImageOutcome, ImageRecord, PageReport,
    PdfpixConfig, Profile, RunReport, SkipReason,
};
use crate::naming;
use crate::pdf::{GlyphMetrics, ImageRef, PageContent, PageSource, PdfDocument};
use crate::position::{self, HeadingTracker, PositionTag};
use crate::writer;

/// List the input documents in `dir`, sorted by name.
///
/// Fails with [`PdfpixError::InputMissing`] when the directory does not
/// exist or holds no file with one of `extensions` (compared
/// case-insensitively).
pub fn discover_inputs(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let missing = || PdfpixError::InputMissing {
        path: dir.to_path_buf(),
    };
    if !dir.is_dir() {
        return Err(missing());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(&ext))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(missing());
    }
    debug!("Found {} input files in {}", files.len(), dir.display());
    Ok(files)
}

/// Runs documents through position resolution, filtering, naming and
/// writing.
///
/// The configuration is borrowed for the lifetime of the extractor and never
/// changes during a run.
pub struct Extractor<'c> {
    config: &'c PdfpixConfig,
    headings: HeadingTracker,
    written: usize,
}

impl<'c> Extractor<'c> {
    pub fn new(config: &'c PdfpixConfig) -> Self {
        Self {
            config,
            headings: HeadingTracker::new(),
            written: 0,
        }
    }

    /// Images written since the extractor was created.
    pub fn written(&self) -> usize {
        self.written
    }

    fn output_dir(&self) -> &Path {
        &self.config.output.images_dir
    }

    /// Create (and, if configured, clear) the output directory. Call once
    /// before the first document.
    pub fn prepare(&self) -> Result<()> {
        let removed = writer::prepare_output_dir(self.output_dir(), self.config.output.clear_on_start)?;
        if removed > 0 {
            info!("Removed {} files from {}", removed, self.output_dir().display());
        }
        Ok(())
    }

    /// Process every path in order and collect a run report.
    ///
    /// With `isolate_failures`, a document that fails is logged and listed in
    /// [`RunReport::failed`]; otherwise the first failure aborts the run.
    pub fn run(&mut self, paths: &[PathBuf], isolate_failures: bool) -> Result<RunReport> {
        self.run_with(paths, isolate_failures, |_, _| {})
    }

    /// Like [`Extractor::run`], calling `on_document(position, path)` before
    /// each document.
    pub fn run_with<F>(
        &mut self,
        paths: &[PathBuf],
        isolate_failures: bool,
        mut on_document: F,
    ) -> Result<RunReport>
    where
        F: FnMut(usize, &Path),
    {
        let mut report = RunReport::new(self.config.profile, self.output_dir().to_path_buf());
        self.prepare()?;
        for (position, path) in paths.iter().enumerate() {
            on_document(position, path);
            match self.extract_file(path) {
                Ok(document) => report.documents.push(document),
                Err(e) if isolate_failures => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    report.failed.push(FailedDocument {
                        source: path.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "Finished: {} images written, {} skipped, {} documents failed",
            report.written(),
            report.skipped(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Open a PDF file, extract it and close it again.
    pub fn extract_file(&mut self, path: &Path) -> Result<DocumentReport> {
        let metrics = GlyphMetrics {
            ascent: self.config.position.ascent,
            descent: self.config.position.descent,
        };
        let document = PdfDocument::open(path)?.with_metrics(metrics);
        let prefix = naming::document_prefix(path);
        let report = self.extract_document(&document, path, &prefix);
        document.close();
        report
    }

    /// Extract all images of one document.
    ///
    /// `prefix` is used in line-estimate names. The per-heading counter
    /// starts over for every document.
    pub fn extract_document<S: PageSource>(
        &mut self,
        source: &S,
        doc_path: &Path,
        prefix: &str,
    ) -> Result<DocumentReport> {
        self.headings.reset();

        let mut pages = Vec::with_capacity(source.page_count());
        for index in 0..source.page_count() {
            let page = source.page(index)?;
            pages.push(self.extract_page(page, prefix)?);
        }

        let report = DocumentReport {
            source: doc_path.to_path_buf(),
            pages,
        };
        info!(
            "Extracted {} images from {} to {}",
            report.written(),
            doc_path.display(),
            self.output_dir().display()
        );
        Ok(report)
    }

    fn extract_page(&mut self, page: PageContent, prefix: &str) -> Result<PageReport> {
        let PageContent {
            index,
            mut images,
            text,
            spans,
        } = page;
        let image_count = images.len();

        let heading = match self.config.profile {
            Profile::LineEstimate => {
                position::order_by_top(&mut images);
                None
            }
            Profile::HeadingPath => {
                let path = position::heading_path(text.as_deref().unwrap_or(""));
                if self.headings.enter_page(&path) {
                    debug!("Page {}: heading path changed to {}", index + 1, path);
                }
                Some(PositionTag::Heading(path))
            }
        };

        debug!(
            "Page {}: text={}, position={}, images={}",
            index + 1,
            text.is_some(),
            heading
                .as_ref()
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".to_string()),
            image_count
        );

        let mut page_index = 0;
        let mut records = Vec::with_capacity(image_count);
        for image in images {
            let position = match &heading {
                Some(tag) => tag.clone(),
                None => PositionTag::Line(position::line_number(
                    image.top(),
                    &spans,
                    self.config.position.line_height,
                )),
            };
            let outcome = self.extract_image(&image, index, &position, prefix, &mut page_index)?;
            records.push(ImageRecord {
                page: index,
                xref: image.xref,
                position,
                outcome,
            });
        }

        Ok(PageReport {
            index,
            has_text: text.is_some(),
            heading,
            image_count,
            records,
        })
    }

    /// Decode, filter, resize, name and write one image.
    ///
    /// Only write failures with `abort_on_write_error` set come back as
    /// errors; everything else is recorded as skipped.
    fn extract_image(
        &mut self,
        image: &ImageRef,
        page: usize,
        position: &PositionTag,
        prefix: &str,
        page_index: &mut u32,
    ) -> Result<ImageOutcome> {
        let decoded = match imaging::decode(&image.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Skipping image {} on page {}: {}", image.xref, page + 1, e);
                return Ok(ImageOutcome::Skipped {
                    reason: SkipReason::Decode {
                        detail: e.to_string(),
                    },
                });
            }
        };

        let filter = &self.config.filter;
        let (width, height) = (decoded.width(), decoded.height());
        if !imaging::passes_min_dimension(width, height, filter.min_dimension) {
            let min = filter.min_dimension.unwrap_or_default();
            debug!(
                "Dropping image {} on page {}: {}x{} below {}",
                image.xref,
                page + 1,
                width,
                height,
                min
            );
            return Ok(ImageOutcome::Skipped {
                reason: SkipReason::TooSmall { width, height, min },
            });
        }

        let output = match filter.resize_ratio {
            Some(ratio) => imaging::downsample(&decoded, ratio).unwrap_or(decoded),
            None => decoded,
        };

        let index = match position {
            PositionTag::Line(_) => {
                *page_index += 1;
                *page_index
            }
            PositionTag::Heading(_) => self.headings.next_index(),
        };
        let base = naming::base_name(prefix, page, index, position);
        let policy = self.config.output.collision;
        let target = naming::resolve(self.output_dir(), &base, policy);
        let replaced = target.existed && policy == CollisionPolicy::Overwrite;
        if replaced {
            info!("Overwriting {}", target.path.display());
        }

        if let Err(e) = writer::write_webp(&output, &target.path, self.config.output.quality) {
            if self.config.output.abort_on_write_error {
                return Err(e);
            }
            warn!("Failed to save {}: {}", target.path.display(), e);
            return Ok(ImageOutcome::Skipped {
                reason: SkipReason::Write {
                    detail: e.to_string(),
                },
            });
        }

        self.written += 1;
        debug!("Image saved: {}", target.path.display());
        Ok(ImageOutcome::Written {
            path: target.path,
            width: output.width(),
            height: output.height(),
            replaced,
        })
    }
}
