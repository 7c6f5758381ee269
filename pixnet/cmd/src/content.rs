//! The `.pxnt` content directory.
//!
//! Pages are loaded once at startup and served by file stem; `index` is
//! the landing page. An empty or missing directory gets a generated sample
//! site so a fresh install has something to serve.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use pixnet_page::{Behavior, CategoryDef, NavigateKind, Page, PageMetadata};
use pixnet_pxnt::{read_page, write_page_with, Compression, WriteOptions};
use pixnet_server::AppHandler;
use pixnet_wire::PixelFormat;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// In-memory page store keyed by page name.
pub struct ContentStore {
    pages: HashMap<String, Arc<Page>>,
}

impl ContentStore {
    /// Load every `.pxnt` file in a directory. Creates the directory and a
    /// sample site when nothing is there to serve.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            info!("creating content directory {:?}", dir);
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating content dir {dir:?}"))?;
        }

        let mut store = Self {
            pages: HashMap::new(),
        };
        store.load_dir(dir)?;

        if !store.pages.contains_key("index") {
            warn!("no index page found, generating sample content");
            write_sample_content(dir)?;
            store.pages.clear();
            store.load_dir(dir)?;
        }

        info!(
            "serving {} pages: {:?}",
            store.pages.len(),
            store.pages.keys().collect::<Vec<_>>()
        );
        Ok(store)
    }

    fn load_dir(&mut self, dir: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(pixnet_pxnt::FILE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let raw = std::fs::read(&path)?;
            match read_page(&raw) {
                Ok(page) => {
                    info!("loaded page {:?} from {:?}", name, path);
                    self.pages.insert(name.to_string(), Arc::new(page));
                }
                Err(e) => {
                    warn!("skipping {:?}: {} (code {})", path, e, e.code());
                }
            }
        }
        Ok(())
    }

    /// Look up a page by name.
    pub fn get(&self, name: &str) -> Option<Arc<Page>> {
        self.pages.get(name).cloned()
    }

    /// Number of loaded pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
impl AppHandler for ContentStore {
    async fn landing_page(&self) -> Option<Arc<Page>> {
        self.get("index")
    }

    async fn page_for(&self, path: &str) -> Option<Arc<Page>> {
        let name = path.trim_start_matches('/');
        if name.is_empty() {
            return self.get("index");
        }
        self.get(name)
    }
}

struct SampleButton {
    label: &'static str,
    x: u16,
    y: u16,
    behavior: Behavior,
}

/// Generate a small navigable sample site.
fn write_sample_content(dir: &Path) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    let index = sample_page(
        "Welcome to PIXNET",
        [40, 60, 140],
        &[
            SampleButton {
                label: "home",
                x: 40,
                y: 96,
                behavior: Behavior::Navigate {
                    target: "/index".to_string(),
                    kind: NavigateKind::Same,
                },
            },
            SampleButton {
                label: "about",
                x: 140,
                y: 96,
                behavior: Behavior::Navigate {
                    target: "/about".to_string(),
                    kind: NavigateKind::Same,
                },
            },
            SampleButton {
                label: "demo",
                x: 240,
                y: 96,
                behavior: Behavior::EmitEvent {
                    name: "demo_click".to_string(),
                    event_type: 0,
                    debounce_ms: 100,
                },
            },
        ],
    )?;

    let about = sample_page(
        "About PIXNET",
        [60, 120, 80],
        &[SampleButton {
            label: "back",
            x: 40,
            y: 96,
            behavior: Behavior::Navigate {
                target: "/index".to_string(),
                kind: NavigateKind::Same,
            },
        }],
    )?;

    let options = WriteOptions {
        compression: Compression::Zlib,
        created: now,
        modified: now,
    };
    std::fs::write(dir.join("index.pxnt"), write_page_with(&index, &options)?)?;
    std::fs::write(dir.join("about.pxnt"), write_page_with(&about, &options)?)?;
    Ok(())
}

/// Build one 320x200 page: background gradient, title bar, button zones.
fn sample_page(title: &str, base: [u8; 3], buttons: &[SampleButton]) -> Result<Page> {
    const WIDTH: u16 = 320;
    const HEIGHT: u16 = 200;
    const BUTTON_W: u16 = 80;
    const BUTTON_H: u16 = 28;

    let pixel_count = WIDTH as usize * HEIGHT as usize;
    let mut pixels = BytesMut::with_capacity(pixel_count * 4);
    for y in 0..HEIGHT {
        for _x in 0..WIDTH {
            if y < 40 {
                pixels.put_slice(&[24, 24, 48, 0xFF]);
            } else {
                let shade = ((y as u32 * 80) / HEIGHT as u32) as u8;
                pixels.put_slice(&[
                    base[0],
                    base[1].saturating_add(shade),
                    base[2],
                    0xFF,
                ]);
            }
        }
    }

    let mut category_map = vec![0u16; pixel_count];
    let mut categories = BTreeMap::new();

    for (i, button) in buttons.iter().enumerate() {
        let cid = (i + 1) as u16;
        for dy in 0..BUTTON_H {
            for dx in 0..BUTTON_W {
                let (px, py) = (button.x + dx, button.y + dy);
                if px < WIDTH && py < HEIGHT {
                    let idx = py as usize * WIDTH as usize + px as usize;
                    category_map[idx] = cid;
                }
            }
        }
        categories.insert(
            cid,
            CategoryDef {
                id: cid,
                name: format!("{}_{}", button.label, cid),
                behavior_id: button.behavior.id(),
                priority: 128,
                behavior_data: button.behavior.encode(),
                extended: Vec::new(),
            },
        );
    }

    let mut page = Page::new(
        WIDTH,
        HEIGHT,
        PixelFormat::Rgba8,
        pixels.freeze(),
        category_map,
        categories,
    )?;
    page.metadata = Some(PageMetadata {
        title: title.to_string(),
        ..PageMetadata::default()
    });
    Ok(page)
}
