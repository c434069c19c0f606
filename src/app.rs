use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use dioxus::prelude::*;
use serde::Deserialize;

use day_timeline::core::annotation::{AnnotationController, AnnotationHandle};
use day_timeline::core::detections::{DetectionFeed, DetectionFilter};
use day_timeline::core::panzoom::{
    PanZoomController, PanZoomOptions, PointerInput, PointerState, WheelInput,
};
use day_timeline::core::ratio::ElementRect;
use day_timeline::core::renderer::{LaneConfig, RenderInput, TimelineRenderer};
use day_timeline::core::scale::ScaleClassifier;
use day_timeline::core::thumbnails::{ImageStore, PendingFetch, ThumbnailPrefetcher};
use day_timeline::providers::{HttpDetectionSource, HttpThumbnailSource};
use day_timeline::state::{DetectionInterval, TimeInterval, TimelineSettings, Tooltip, VisiblePortion};

use crate::constants::{
    BG_DEEPEST, DEFAULT_LANES, DEFAULT_SOURCE_ID, SETTINGS_FILE, TEXT_MUTED,
    TIMELINE_GEOMETRY_SCRIPT, VISIBLE_POLL_MS, ZOOM_STEP,
};
use crate::timeline::{PreviewStatus, TimelinePanel};
use crate::utils::{format_zoom, thumbnail_url};

type Prefetcher = ThumbnailPrefetcher<HttpThumbnailSource>;

/// Images currently materialized for the preview, served by the "thumb" protocol.
pub fn image_store() -> &'static ImageStore {
    static STORE: OnceLock<ImageStore> = OnceLock::new();
    STORE.get_or_init(ImageStore::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
struct LanesRect {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl From<LanesRect> for ElementRect {
    fn from(rect: LanesRect) -> Self {
        ElementRect::new(rect.left, rect.top, rect.width, rect.height)
    }
}

fn load_settings() -> TimelineSettings {
    match TimelineSettings::load_or_default(Path::new(SETTINGS_FILE)) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load settings, using defaults");
            TimelineSettings::default()
        }
    }
}

fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

fn day_interval(date: NaiveDate, tz: Tz) -> TimeInterval {
    TimeInterval::for_day(date, tz).unwrap_or_else(|err| {
        tracing::warn!(error = %err, %date, "falling back to a UTC day");
        let start = chrono_tz::UTC.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        TimeInterval {
            time_start: start,
            time_end: start + chrono::Duration::days(1),
        }
    })
}

/// Push a new visible window to everything that follows it.
fn apply_portion(
    portion: Option<VisiblePortion>,
    controller: Signal<PanZoomController>,
    mut visible: Signal<VisiblePortion>,
    mut scale: Signal<f64>,
    mut prefetcher: Signal<Option<Prefetcher>>,
) {
    let Some(portion) = portion else {
        return;
    };
    visible.set(portion);
    scale.set(controller.peek().scale());
    if let Some(prefetcher) = prefetcher.write().as_mut() {
        prefetcher.set_visible_portion(portion);
    }
}

fn spawn_thumbnail_fetch(pending: PendingFetch, mut prefetcher: Signal<Option<Prefetcher>>) {
    spawn(async move {
        let (ticket, result) = pending.run().await;
        if let Some(prefetcher) = prefetcher.write().as_mut() {
            prefetcher.complete(ticket, result);
        }
    });
}

fn pointer_input(e: &PointerEvent) -> PointerInput {
    let coords = e.client_coordinates();
    PointerInput {
        pointer_id: i64::from(e.pointer_id()),
        client_x: coords.x,
        client_y: coords.y,
    }
}

/// Main application component
#[component]
pub fn App() -> Element {
    let settings = use_signal(load_settings);
    let tz = use_hook(|| {
        settings.peek().tz().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "unknown time zone, rendering in UTC");
            chrono_tz::UTC
        })
    });
    let lanes: Vec<LaneConfig> = use_hook(|| {
        DEFAULT_LANES
            .iter()
            .map(|(category, label)| LaneConfig::new(*category, *label))
            .collect()
    });
    let renderer = use_hook(|| {
        TimelineRenderer::from_settings(lanes.clone(), &settings.peek(), ScaleClassifier::default())
    });

    let mut date = use_signal(move || today(tz));
    let interval = use_memo(move || day_interval(date(), tz));

    let mut controller = use_signal(|| {
        PanZoomController::new(
            PanZoomOptions::from_settings(&settings.peek(), false),
            ScaleClassifier::default(),
        )
    });
    let visible = use_signal(VisiblePortion::default);
    let scale = use_signal(|| 1.0_f64);
    let mut container = use_signal(|| None::<ElementRect>);
    let mut geometry_eval = use_signal(|| None::<document::Eval>);

    let mut annotation = use_signal(|| {
        AnnotationController::new(*interval.peek(), settings.peek().annotation_clip_duration())
    });
    let mut tooltip = use_signal(Tooltip::hidden);

    let mut feed = use_signal(|| {
        DetectionFeed::new(HttpDetectionSource::new(settings.peek().detection_base_url.clone()))
    });
    let mut detections = use_signal(Vec::<DetectionInterval>::new);
    let mut status_message = use_signal(|| None::<String>);
    let mut prefetcher = use_signal(|| None::<Prefetcher>);

    use_effect(move || {
        if geometry_eval().is_some() {
            return;
        }
        let eval = document::eval(TIMELINE_GEOMETRY_SCRIPT);
        geometry_eval.set(Some(eval));
    });

    // Mount on the first reported rect, then follow resizes.
    use_future(move || async move {
        loop {
            let Some(mut eval) = geometry_eval() else {
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            };
            while let Ok(rect) = eval.recv::<LanesRect>().await {
                let rect = ElementRect::from(rect);
                container.set(Some(rect));
                let portion = {
                    let mut controller = controller.write();
                    if controller.is_mounted() {
                        controller.set_container(rect);
                    } else if let Err(err) = controller.mount(Some(rect)) {
                        tracing::warn!(error = %err, "timeline mount failed");
                        continue;
                    }
                    controller.visible_portion()
                };
                apply_portion(Some(portion), controller, visible, scale, prefetcher);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    });

    // A new day: reload detections and start a fresh prefetcher.
    use_effect(move || {
        let interval = interval();
        annotation.write().set_interval(interval);
        tooltip.set(Tooltip::hidden());

        let pending = feed
            .write()
            .load(DetectionFilter::for_source(DEFAULT_SOURCE_ID), &interval);
        spawn(async move {
            let (ticket, result) = pending.run().await;
            if feed.write().complete(ticket, result) {
                let feed = feed.read();
                detections.set(feed.detections().to_vec());
                status_message.set(
                    feed.last_error()
                        .map(|err| format!("Detections unavailable: {}", err)),
                );
            }
        });

        let settings = settings.peek();
        let mut next = ThumbnailPrefetcher::new(
            HttpThumbnailSource::new(settings.thumbnail_base_url.clone()),
            DEFAULT_SOURCE_ID,
            interval,
            &settings,
            image_store().clone(),
        );
        next.set_visible_portion(*visible.peek());
        if let Some(mut previous) = prefetcher.write().replace(next) {
            previous.teardown();
        }
    });

    // Dense fetch once the visible window settles.
    use_future(move || async move {
        loop {
            tokio::time::sleep(Duration::from_millis(VISIBLE_POLL_MS)).await;
            let pending = prefetcher
                .write()
                .as_mut()
                .and_then(|prefetcher| prefetcher.poll_visible());
            if let Some(pending) = pending {
                spawn_thumbnail_fetch(pending, prefetcher);
            }
        }
    });

    use_drop(move || {
        controller.write().unmount();
        feed.write().cancel();
        if let Some(mut previous) = prefetcher.write().take() {
            previous.teardown();
        }
    });

    // Frame
    let current_interval = interval();
    let portion = visible();
    let width = container().map(|rect| rect.width).unwrap_or(0.0);
    let level = controller.read().scale_detail();
    let tip = tooltip();
    let frame = {
        let detections = detections.read();
        renderer.render(&RenderInput {
            width,
            interval: &current_interval,
            portion,
            level,
            detections: &detections,
            now: Utc::now(),
            annotation: annotation.read().annotation(),
            tooltip: tip,
        })
    };

    // Preview
    let (thumbnail_state, not_found) = prefetcher
        .read()
        .as_ref()
        .map(|prefetcher| (prefetcher.state(), prefetcher.thumbnail_not_found()))
        .unwrap_or_default();
    let preview_status = if thumbnail_state.is_error {
        PreviewStatus::Error
    } else if thumbnail_state.thumbnail.is_some() {
        PreviewStatus::Ready
    } else if not_found {
        PreviewStatus::NotFound
    } else {
        PreviewStatus::Loading
    };
    let preview_url = thumbnail_state
        .thumbnail
        .map(|selected| thumbnail_url(selected.handle));
    let preview_x = tip.visible.then(|| tip.window_ratio(&portion) * width);
    let preview_label = tip
        .tooltip_time
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_default();

    let renderer_for_click = renderer.clone();
    let settle_delay = settings.peek().settle_delay();
    let now_zoom = settings.peek().mobile_zoom;

    rsx! {
        div {
            style: "
                display: flex; flex-direction: column; justify-content: flex-end;
                width: 100vw; height: 100vh;
                background-color: {BG_DEEPEST};
                font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            ",
            div {
                style: "flex: 1; display: flex; align-items: center; justify-content: center; color: {TEXT_MUTED}; font-size: 12px;",
                "Hover the timeline to preview, click to mark a clip"
            }
            TimelinePanel {
                frame: frame,
                lanes: lanes.clone(),
                date_label: date().format("%a %d %b %Y").to_string(),
                zoom_label: format_zoom(scale()),
                level_label: level.label().to_string(),
                status_message: status_message(),
                preview_x: preview_x,
                preview_url: preview_url,
                preview_status: preview_status,
                preview_label: preview_label,
                on_zoom_in: move |_| {
                    let portion = controller.write().zoom_by(ZOOM_STEP);
                    apply_portion(portion, controller, visible, scale, prefetcher);
                },
                on_zoom_out: move |_| {
                    let portion = controller.write().zoom_by(1.0 / ZOOM_STEP);
                    apply_portion(portion, controller, visible, scale, prefetcher);
                },
                on_fit: move |_| {
                    let portion = {
                        let mut controller = controller.write();
                        let factor = controller.options().min_scale / controller.scale();
                        controller.zoom_by(factor)
                    };
                    apply_portion(portion, controller, visible, scale, prefetcher);
                },
                on_now: move |_| {
                    let now = Utc::now();
                    if !interval.peek().is_same_day(&now) {
                        date.set(today(tz));
                    }
                    spawn(async move {
                        let target = controller.peek().scale().max(now_zoom);
                        let pending = controller.write().zoom_to(now, target);
                        apply_portion(Some(controller.peek().visible_portion()), controller, visible, scale, prefetcher);
                        tokio::time::sleep(settle_delay).await;
                        if let Some(pending) = pending {
                            let interval = *interval.peek();
                            let portion = controller.write().pan_to(pending, &interval);
                            apply_portion(portion, controller, visible, scale, prefetcher);
                        }
                    });
                },
                on_prev_day: move |_| {
                    if let Some(previous) = date().pred_opt() {
                        date.set(previous);
                    }
                },
                on_next_day: move |_| {
                    if let Some(next) = date().succ_opt() {
                        date.set(next);
                    }
                },
                on_pointer_down: move |e: PointerEvent| {
                    let portion = controller.write().pointer_down(pointer_input(&e), Instant::now());
                    apply_portion(portion, controller, visible, scale, prefetcher);
                },
                on_pointer_move: move |e: PointerEvent| {
                    let input = pointer_input(&e);
                    let dragging = matches!(controller.peek().pointer_state(), PointerState::Dragging { .. });
                    if dragging {
                        let portion = controller.write().pointer_move(input);
                        apply_portion(portion, controller, visible, scale, prefetcher);
                    }
                    let Some(rect) = container() else {
                        return;
                    };
                    let hover = Tooltip::from_pointer(
                        input.client_x - rect.left,
                        rect.width,
                        &visible.peek(),
                        &interval.peek(),
                    );
                    tooltip.set(hover);
                    let Some(time) = hover.tooltip_time else {
                        return;
                    };
                    let time = time.with_timezone(&Utc);
                    let pending = prefetcher.write().as_mut().and_then(|prefetcher| {
                        let pending = prefetcher.initial_fetch(time);
                        prefetcher.set_pointer_time(time);
                        pending
                    });
                    if let Some(pending) = pending {
                        spawn_thumbnail_fetch(pending, prefetcher);
                    }
                },
                on_pointer_up: move |e: PointerEvent| {
                    let Some(release) = controller.write().pointer_up(pointer_input(&e), Instant::now()) else {
                        return;
                    };
                    apply_portion(Some(controller.peek().visible_portion()), controller, visible, scale, prefetcher);
                    let Some(rect) = container() else {
                        return;
                    };
                    let clicked = renderer_for_click.click_to_time(
                        release.client_x - rect.left,
                        rect.width,
                        &visible.peek(),
                        &interval.peek(),
                        release.elapsed,
                        Utc::now(),
                    );
                    if let Some(time) = clicked {
                        annotation.write().set_annotation_from_time(time);
                    }
                },
                on_pointer_leave: move |e: PointerEvent| {
                    // A drag that leaves the lanes ends there, never as a click.
                    controller.write().pointer_up(pointer_input(&e), Instant::now());
                    tooltip.set(Tooltip::hidden());
                },
                on_wheel: move |e: WheelEvent| {
                    let delta = e.delta().strip_units();
                    let input = WheelInput {
                        delta_x: delta.x,
                        delta_y: delta.y,
                        client_x: e.client_coordinates().x,
                    };
                    if !input.is_zoom() {
                        return;
                    }
                    e.prevent_default();
                    let portion = controller.write().wheel(input);
                    apply_portion(portion, controller, visible, scale, prefetcher);
                },
            }
        }
    }
}
