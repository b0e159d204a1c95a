//! `meeting-widget simulate`: scripted sessions against the headless provider.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schatzkarte_core::{Frame, MeetingAction, MeetingDescriptor, Point, Size};
use schatzkarte_widget::provider::headless::{HeadlessBehavior, HeadlessSdk};
use schatzkarte_widget::{MeetingWidget, WidgetConfig, WidgetError, WidgetView};
use serde::Serialize;
use tracing::debug;

use super::view::render_text;
use super::{headless_fetcher, headless_widget};
use crate::descriptor;
use crate::error::CliResult;

/// One scripted user or timer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Join,
    Toggle,
    Minimize,
    Restore,
    Leave,
    Tick,
    ForceJoin,
    Unmount,
    /// Drag the title bar by a pointer delta.
    Drag(Point),
    /// Drag the resize handle by a pointer delta.
    Resize(Point),
    Viewport(Size),
}

impl FromStr for Step {
    type Err = WidgetError;

    fn from_str(step: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match step.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (step, None),
        };
        let parsed = match (name, arg) {
            ("join", None) => Self::Join,
            ("toggle", None) => Self::Toggle,
            ("minimize", None) => Self::Minimize,
            ("restore", None) => Self::Restore,
            ("leave", None) => Self::Leave,
            ("tick", None) => Self::Tick,
            ("force-join", None) => Self::ForceJoin,
            ("unmount", None) => Self::Unmount,
            ("drag", Some(arg)) => {
                let (dx, dy) = parse_pair(step, arg, ',')?;
                Self::Drag(Point::new(dx, dy))
            }
            ("resize", Some(arg)) => {
                let (dx, dy) = parse_pair(step, arg, ',')?;
                Self::Resize(Point::new(dx, dy))
            }
            ("viewport", Some(arg)) => {
                let (width, height) = parse_pair(step, arg, 'x')?;
                if width <= 0.0 || height <= 0.0 {
                    return Err(WidgetError::invalid_step(step, "viewport must be positive"));
                }
                Self::Viewport(Size::new(width, height))
            }
            ("drag" | "resize" | "viewport", None) => {
                return Err(WidgetError::invalid_step(step, "missing argument"));
            }
            (
                "join" | "toggle" | "minimize" | "restore" | "leave" | "tick" | "force-join"
                | "unmount",
                Some(_),
            ) => {
                return Err(WidgetError::invalid_step(step, "step takes no argument"));
            }
            _ => return Err(WidgetError::invalid_step(step, "unknown step")),
        };
        Ok(parsed)
    }
}

fn parse_pair(step: &str, arg: &str, separator: char) -> Result<(f64, f64), WidgetError> {
    let (a, b) = arg
        .split_once(separator)
        .ok_or_else(|| WidgetError::invalid_step(step, format!("expected A{separator}B")))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| WidgetError::invalid_step(step, e.to_string()))
    };
    Ok((parse(a)?, parse(b)?))
}

/// Failure injection for a simulated session.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_load: Option<String>,
    pub fail_hangup: bool,
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: String,
    /// Whether the widget accepted the input.
    pub applied: bool,
    pub view: WidgetView,
    pub actions: Vec<MeetingAction>,
}

/// Parses `steps`, runs them and prints one report per step.
pub async fn run(
    config: &WidgetConfig,
    path: &Path,
    at: Option<DateTime<Utc>>,
    steps: &[String],
    faults: Faults,
    json: bool,
) -> CliResult<()> {
    let parsed = steps
        .iter()
        .map(|raw| raw.parse::<Step>().map(|step| (raw.clone(), step)))
        .collect::<Result<Vec<_>, _>>()?;
    let descriptor = descriptor::load(path, at)?;

    let reports = simulate(descriptor, config.clone(), &parsed, &faults).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let marker = if report.applied { ' ' } else { '!' };
            println!("{marker} {:<16} {}", report.step, render_text(&report.view));
            for action in &report.actions {
                println!("  -> {} ({})", action.action, action.meeting_id);
            }
        }
    }
    Ok(())
}

/// Runs `steps` against a headless widget, settling provider work after each.
pub async fn simulate(
    descriptor: MeetingDescriptor,
    config: WidgetConfig,
    steps: &[(String, Step)],
    faults: &Faults,
) -> Vec<StepReport> {
    let sdk = HeadlessSdk::with_behavior(HeadlessBehavior {
        fail_hangup: faults.fail_hangup,
        ..Default::default()
    });
    let fetcher = headless_fetcher(&sdk, faults.fail_load.as_deref());
    let (mut widget, log) = headless_widget(descriptor, config, fetcher);

    let mut reports = Vec::with_capacity(steps.len());
    for (raw, step) in steps {
        let applied = apply(&mut widget, *step);
        widget.settle().await;
        debug!(step = %raw, applied, mode = %widget.mode(), "Simulated step");
        reports.push(StepReport {
            step: raw.clone(),
            applied,
            view: widget.view(),
            actions: log.drain(),
        });
    }
    reports
}

fn apply(widget: &mut MeetingWidget, step: Step) -> bool {
    match step {
        Step::Join => widget.click_join(),
        Step::Toggle => widget.toggle_size(),
        Step::Minimize => widget.minimize(),
        Step::Restore => widget.restore(),
        Step::Leave => widget.request_leave(),
        Step::Tick => widget.countdown_tick(),
        Step::ForceJoin => {
            let before = widget.mode();
            widget.set_force_join(true);
            widget.mode() != before
        }
        Step::Unmount => {
            let mounted = widget.is_mounted();
            widget.unmount();
            mounted
        }
        Step::Drag(delta) => {
            let grip = title_grip(widget.state().frame());
            if !widget.pointer_down_title(grip, false) {
                return false;
            }
            widget.pointer_move(grip.offset(delta));
            widget.pointer_up()
        }
        Step::Resize(delta) => {
            let handle = resize_grip(widget.state().frame());
            if !widget.pointer_down_resize(handle) {
                return false;
            }
            widget.pointer_move(handle.offset(delta));
            widget.pointer_up()
        }
        Step::Viewport(size) => {
            widget.set_viewport(size);
            true
        }
    }
}

fn title_grip(frame: Frame) -> Point {
    Point::new(
        frame.position.x + frame.size.width / 2.0,
        frame.position.y + 12.0,
    )
}

fn resize_grip(frame: Frame) -> Point {
    Point::new(
        frame.position.x + frame.size.width - 4.0,
        frame.position.y + frame.size.height - 4.0,
    )
}
