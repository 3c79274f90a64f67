//! Grounding annotations for vision-language replies.
//!
//! Models such as Qwen-VL answer grounding questions with
//! `<ref>label</ref><box>(x1,y1),(x2,y2)</box>` markup in a 0..1000
//! normalised coordinate space. [`GroundingAnnotator`] pulls those regions out
//! of a finished reply and outlines them on the most recent picture in the
//! conversation, saving the result as a PNG artifact.

use image::{Rgba, RgbaImage};
use pl_domain::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const BOX_COLOUR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BOX_THICKNESS: u32 = 2;

fn box_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        match Regex::new(
            r"(?s)(?:<ref>(.*?)</ref>)?\s*<box>\(\s*(\d+)\s*,\s*(\d+)\s*\)\s*,\s*\(\s*(\d+)\s*,\s*(\d+)\s*\)</box>",
        ) {
            Ok(re) => re,
            Err(_) => unreachable!("box regex is valid"),
        }
    })
}

fn img_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"<img>(.*?)</img>") {
        Ok(re) => re,
        Err(_) => unreachable!("img regex is valid"),
    })
}

/// One labelled box, corners in 0..1000 normalised coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub label: Option<String>,
    pub top_left: (u32, u32),
    pub bottom_right: (u32, u32),
}

/// Every box in `text`, in order of appearance.
pub fn parse_regions(text: &str) -> Vec<Region> {
    box_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let n = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            Some(Region {
                label: caps
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|l| !l.is_empty()),
                top_left: (n(2)?, n(3)?),
                bottom_right: (n(4)?, n(5)?),
            })
        })
        .collect()
}

/// Path of the last picture referenced in `history`, newest pair first.
pub fn latest_picture(history: &[(String, String)]) -> Option<PathBuf> {
    history.iter().rev().find_map(|(query, _)| {
        img_re()
            .captures_iter(query)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| PathBuf::from(m.as_str()))
    })
}

/// Writes annotated pictures under a fixed directory.
#[derive(Debug, Clone)]
pub struct GroundingAnnotator {
    dir: PathBuf,
}

impl GroundingAnnotator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Outline the boxes in `response` on the latest picture in `history`
    /// and return the saved PNG. `Ok(None)` when there are no boxes or no
    /// picture; an unreadable picture is an error.
    ///
    /// `history` must include the turn that produced `response`. Labels are
    /// not drawn.
    pub async fn annotate(
        &self,
        response: &str,
        history: &[(String, String)],
    ) -> Result<Option<PathBuf>> {
        let regions = parse_regions(response);
        if regions.is_empty() {
            return Ok(None);
        }
        let Some(picture) = latest_picture(history) else {
            tracing::debug!(regions = regions.len(), "boxes found but no picture in history");
            return Ok(None);
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("annotation-{}.png", uuid::Uuid::new_v4()));

        let out = path.clone();
        tokio::task::spawn_blocking(move || render(&picture, &regions, &out))
            .await
            .map_err(|e| Error::Other(format!("annotation task: {e}")))??;

        tracing::debug!(path = %path.display(), "annotation written");
        Ok(Some(path))
    }
}

// ── Drawing ────────────────────────────────────────────────────────

fn render(picture: &Path, regions: &[Region], out: &Path) -> Result<()> {
    let mut canvas = image::open(picture)
        .map_err(|e| Error::Other(format!("decoding {}: {e}", picture.display())))?
        .to_rgba8();
    draw_regions(&mut canvas, regions);
    canvas
        .save(out)
        .map_err(|e| Error::Other(format!("writing {}: {e}", out.display())))
}

/// Map a 0..1000 coordinate onto a pixel index in `0..extent`.
fn scale(v: u32, extent: u32) -> u32 {
    let px = u64::from(v.min(1000)) * u64::from(extent) / 1000;
    (px as u32).min(extent.saturating_sub(1))
}

fn draw_regions(canvas: &mut RgbaImage, regions: &[Region]) {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    for region in regions {
        let (ax, ay) = (scale(region.top_left.0, w), scale(region.top_left.1, h));
        let (bx, by) = (scale(region.bottom_right.0, w), scale(region.bottom_right.1, h));
        let (x0, x1) = (ax.min(bx), ax.max(bx));
        let (y0, y1) = (ay.min(by), ay.max(by));

        for t in 0..BOX_THICKNESS {
            let (left, right) = (x0 + t, x1.saturating_sub(t));
            let (top, bottom) = (y0 + t, y1.saturating_sub(t));
            if left > right || top > bottom {
                break;
            }
            for x in left..=right {
                canvas.put_pixel(x, top, BOX_COLOUR);
                canvas.put_pixel(x, bottom, BOX_COLOUR);
            }
            for y in top..=bottom {
                canvas.put_pixel(left, y, BOX_COLOUR);
                canvas.put_pixel(right, y, BOX_COLOUR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labelled_and_bare_boxes() {
        let text = "<ref>the dog</ref><box>(10,20),(300,400)</box> and <box>(1, 2), (3, 4)</box>";
        let regions = parse_regions(text);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].label.as_deref(), Some("the dog"));
        assert_eq!(regions[0].top_left, (10, 20));
        assert_eq!(regions[0].bottom_right, (300, 400));
        assert_eq!(regions[1].label, None);
        assert_eq!(regions[1].bottom_right, (3, 4));
    }

    #[test]
    fn malformed_box_is_ignored() {
        assert!(parse_regions("<box>(a,b),(c,d)</box>").is_empty());
        assert!(parse_regions("no boxes here").is_empty());
    }

    #[test]
    fn latest_picture_prefers_newest_turn() {
        let history = vec![
            ("Picture 1: <img>a.png</img>\nwhat?".to_string(), "cat".to_string()),
            ("Picture 2: <img>b.png</img>\nand?".to_string(), "dog".to_string()),
            ("thanks".to_string(), "ok".to_string()),
        ];
        assert_eq!(latest_picture(&history), Some(PathBuf::from("b.png")));
        assert_eq!(latest_picture(&history[2..]), None);
    }

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn white_picture(dir: &Path) -> PathBuf {
        let path = dir.join("dog.png");
        RgbaImage::from_pixel(100, 100, WHITE).save(&path).unwrap();
        path
    }

    #[test]
    fn coordinates_scale_and_clamp() {
        assert_eq!(scale(0, 640), 0);
        assert_eq!(scale(500, 640), 320);
        assert_eq!(scale(1000, 640), 639);
        assert_eq!(scale(4000, 640), 639);
    }

    #[tokio::test]
    async fn outlines_boxes_on_latest_picture() {
        let dir = tempfile::tempdir().unwrap();
        let picture = white_picture(dir.path());
        let annotator = GroundingAnnotator::new(dir.path().join("out"));
        let history = vec![(
            format!("Picture 1: <img>{}</img>\nwhere is the dog?", picture.display()),
            String::new(),
        )];

        let path = annotator
            .annotate("<ref>dog</ref><box>(100,100),(500,500)</box>", &history)
            .await
            .unwrap()
            .unwrap();
        assert!(path.starts_with(annotator.dir()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

        let drawn = image::open(&path).unwrap().to_rgba8();
        assert_eq!(drawn.dimensions(), (100, 100));
        assert_eq!(*drawn.get_pixel(10, 30), BOX_COLOUR);
        assert_eq!(*drawn.get_pixel(11, 30), BOX_COLOUR);
        assert_eq!(*drawn.get_pixel(50, 50), BOX_COLOUR);
        assert_eq!(*drawn.get_pixel(30, 30), WHITE);
        assert_eq!(*drawn.get_pixel(80, 80), WHITE);

        let source = image::open(&picture).unwrap().to_rgba8();
        assert_eq!(*source.get_pixel(10, 30), WHITE);
    }

    #[tokio::test]
    async fn unreadable_picture_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let annotator = GroundingAnnotator::new(dir.path());
        let history = vec![("<img>missing.png</img>\nhm".to_string(), String::new())];
        let err = annotator
            .annotate("<box>(1,1),(5,5)</box>", &history)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[tokio::test]
    async fn no_artifact_without_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let picture = white_picture(dir.path());
        let annotator = GroundingAnnotator::new(dir.path().join("out"));
        let history = vec![(format!("<img>{}</img>\nhi", picture.display()), String::new())];
        assert!(annotator.annotate("just a dog", &history).await.unwrap().is_none());
        assert!(!annotator.dir().exists());
    }

    #[tokio::test]
    async fn no_artifact_without_picture() {
        let dir = tempfile::tempdir().unwrap();
        let annotator = GroundingAnnotator::new(dir.path());
        let out = annotator
            .annotate("<box>(1,1),(5,5)</box>", &[("hi".into(), String::new())])
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
