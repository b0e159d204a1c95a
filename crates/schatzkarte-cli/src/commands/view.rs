//! `meeting-widget view`: what a freshly mounted widget renders.

use std::path::Path;

use chrono::{DateTime, Utc};
use schatzkarte_widget::provider::headless::HeadlessSdk;
use schatzkarte_widget::{VideoLayout, WidgetConfig, WidgetView};

use super::{headless_fetcher, headless_widget};
use crate::descriptor;
use crate::error::CliResult;

/// Prints the initial view for the descriptor at `path`.
pub fn run(config: &WidgetConfig, path: &Path, at: Option<DateTime<Utc>>, json: bool) -> CliResult<()> {
    let descriptor = descriptor::load(path, at)?;
    let sdk = HeadlessSdk::new();
    let (widget, _) = headless_widget(descriptor, config.clone(), headless_fetcher(&sdk, None));
    let view = widget.view();

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", render_text(&view));
    }
    Ok(())
}

/// One-line human rendering of a view.
pub fn render_text(view: &WidgetView) -> String {
    match view {
        WidgetView::Nothing => "(nothing)".to_string(),
        WidgetView::Countdown {
            minutes_remaining,
            title,
        } => with_title(format!("Treffen in {minutes_remaining} Min"), title.as_deref()),
        WidgetView::JoinButton { title } => with_title("[Beitreten]".to_string(), title.as_deref()),
        WidgetView::Video {
            layout,
            frame,
            loading,
            load_failed,
            shield_surface,
            ..
        } => {
            let mut line = match layout {
                VideoLayout::Small => "small".to_string(),
                VideoLayout::Large => "large".to_string(),
                VideoLayout::Minimized => "minimized".to_string(),
            };
            if let Some(frame) = frame {
                line.push_str(&format!(
                    " {}x{} at ({},{})",
                    frame.size.width, frame.size.height, frame.position.x, frame.position.y
                ));
            }
            if *load_failed {
                line.push_str(" [sdk unavailable]");
            } else if *loading {
                line.push_str(" [loading]");
            }
            if *shield_surface {
                line.push_str(" [dragging]");
            }
            line
        }
    }
}

fn with_title(text: String, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{text} {title}"),
        None => text,
    }
}
