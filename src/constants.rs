//! Shared UI constants such as colors, sizing, and scripts.

pub const BG_DEEPEST: &str = "#09090b";
pub const BG_BASE: &str = "#0a0a0b";
pub const BG_ELEVATED: &str = "#141414";
pub const BG_SURFACE: &str = "#1a1a1a";

pub const BORDER_SUBTLE: &str = "#1f1f1f";
pub const BORDER_DEFAULT: &str = "#27272a";
pub const BORDER_STRONG: &str = "#3f3f46";

pub const TEXT_PRIMARY: &str = "#fafafa";
pub const TEXT_MUTED: &str = "#71717a";
pub const TEXT_DIM: &str = "#52525b";

pub const ACCENT_PERSON: &str = "#3b82f6";
pub const ACCENT_VEHICLE: &str = "#22c55e";
pub const ACCENT_ANIMAL: &str = "#a855f7";
pub const ACCENT_OTHER: &str = "#f97316";
pub const ACCENT_NOW: &str = "#ef4444";
pub const ACCENT_ANNOTATION: &str = "rgba(250, 204, 21, 0.25)";
pub const ACCENT_SCRUB: &str = "rgba(250, 250, 250, 0.6)";

pub const SETTINGS_FILE: &str = "day-timeline.json";
pub const DEFAULT_SOURCE_ID: &str = "default";
pub const AXIS_HEIGHT: f64 = 24.0;
pub const LANE_LABEL_WIDTH: f64 = 120.0;
pub const PREVIEW_WIDTH: f64 = 192.0;
pub const PREVIEW_HEIGHT: f64 = 108.0;
pub const ZOOM_STEP: f64 = 1.25;
pub const VISIBLE_POLL_MS: u64 = 50;

/// Lanes drawn top to bottom, as (category, label).
pub const DEFAULT_LANES: &[(&str, &str)] = &[
    ("person", "People"),
    ("vehicle", "Vehicles"),
    ("animal", "Animals"),
];

/// Reports the lane area's client rect whenever it moves or resizes.
pub const TIMELINE_GEOMETRY_SCRIPT: &str = r#"
const hostId = "timeline-lanes-host";
let last = null;

function sendRect() {
    const host = document.getElementById(hostId);
    if (!host) {
        return;
    }
    const rect = host.getBoundingClientRect();
    const next = { left: rect.left, top: rect.top, width: rect.width, height: rect.height };
    if (last &&
        Math.abs(last.left - next.left) < 0.5 &&
        Math.abs(last.top - next.top) < 0.5 &&
        Math.abs(last.width - next.width) < 0.5 &&
        Math.abs(last.height - next.height) < 0.5) {
        return;
    }
    last = next;
    dioxus.send(next);
}

function attach() {
    const host = document.getElementById(hostId);
    if (!host) {
        setTimeout(attach, 100);
        return;
    }
    const observer = new ResizeObserver(() => sendRect());
    observer.observe(host);
    window.addEventListener("resize", sendRect, { passive: true });
    sendRect();
}

attach();
await new Promise(() => {});
"#;
