use gtk4::prelude::*;

use crate::geometry::{ScreenArea, SurfaceGeometry};

const FALLBACK_SCREEN_AREA: ScreenArea = ScreenArea::new(0, 0, 1920, 1080);

fn monitor_areas() -> Vec<ScreenArea> {
    let Some(display) = gtk4::gdk::Display::default() else {
        return Vec::new();
    };
    let monitors = display.monitors();
    let mut areas = Vec::new();

    for index in 0..monitors.n_items() {
        let Some(item) = monitors.item(index) else {
            continue;
        };
        let Ok(monitor) = item.downcast::<gtk4::gdk::Monitor>() else {
            continue;
        };
        let geometry = monitor.geometry();
        areas.push(ScreenArea::new(
            geometry.x(),
            geometry.y(),
            geometry.width().max(1),
            geometry.height().max(1),
        ));
    }

    areas
}

fn area_for_point(areas: &[ScreenArea], point: Option<(i32, i32)>) -> Option<ScreenArea> {
    let fallback = areas.first().copied();
    let Some((x, y)) = point else {
        return fallback;
    };
    areas
        .iter()
        .copied()
        .find(|area| {
            x >= area.x
                && x < area.x.saturating_add(area.width)
                && y >= area.y
                && y < area.y.saturating_add(area.height)
        })
        .or(fallback)
}

fn center_of(geometry: SurfaceGeometry) -> (i32, i32) {
    (
        geometry.x.saturating_add(geometry.width / 2),
        geometry.y.saturating_add(geometry.height / 2),
    )
}

/// Monitor holding `anchor` (the host window, when known), else the first monitor.
pub(super) fn screen_area_near(anchor: Option<SurfaceGeometry>) -> ScreenArea {
    area_for_point(&monitor_areas(), anchor.map(center_of)).unwrap_or(FALLBACK_SCREEN_AREA)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUAL: [ScreenArea; 2] = [
        ScreenArea::new(0, 0, 1920, 1080),
        ScreenArea::new(1920, 0, 2560, 1440),
    ];

    #[test]
    fn area_for_point_picks_containing_monitor() {
        assert_eq!(area_for_point(&DUAL, Some((2500, 300))), Some(DUAL[1]));
        assert_eq!(area_for_point(&DUAL, Some((100, 100))), Some(DUAL[0]));
    }

    #[test]
    fn area_for_point_falls_back_to_first_monitor() {
        assert_eq!(area_for_point(&DUAL, Some((-400, 5000))), Some(DUAL[0]));
        assert_eq!(area_for_point(&DUAL, None), Some(DUAL[0]));
        assert_eq!(area_for_point(&[], Some((0, 0))), None);
    }

    #[test]
    fn center_of_uses_half_extent() {
        assert_eq!(center_of(SurfaceGeometry::new(100, 200, 600, 400)), (400, 400));
    }
}
