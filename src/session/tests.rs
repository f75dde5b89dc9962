use super::*;
use crate::error::DrawError;
use crate::geometry::centroid;

fn triangle() -> [GeoPoint; 3] {
    [
        GeoPoint::new(41.3851, 2.1701),
        GeoPoint::new(41.3870, 2.1730),
        GeoPoint::new(41.3840, 2.1740),
    ]
}

fn commit_triangle(session: &mut SessionState, name: &str, label: &str) -> CommitOutcome {
    let mut dialogs = ScriptedDialogs::new().answer_prompt(Some(name));
    session.start_drawing().unwrap();
    for p in triangle() {
        session.add_vertex(p).unwrap();
    }
    session.label_inputs.text = label.to_string();
    session.save_shape(&mut dialogs).unwrap()
}

fn approx(a: GeoPoint, b: GeoPoint) -> bool {
    (a.lat - b.lat).abs() < 1e-9 && (a.lon - b.lon).abs() < 1e-9
}

#[test]
fn test_triangle_with_label_end_to_end() {
    let mut session = SessionState::new();
    let mut dialogs = ScriptedDialogs::new().answer_prompt(Some("Lot A"));

    session.start_drawing().unwrap();
    for p in triangle() {
        session.add_vertex(p).unwrap();
    }
    session.label_inputs = LabelInputs {
        text: "North".into(),
        angle: 45.0,
        font_size: 14.0,
    };
    let outcome = session.save_shape(&mut dialogs).unwrap();

    let t = session.territories();
    assert_eq!(t.shapes.len(), 1);
    assert_eq!(t.labels.len(), 1);

    let shape = &t.shapes[0];
    assert_eq!(shape.kind(), ShapeKind::Polygon);
    assert_eq!(shape.name, "Lot A");
    assert_eq!(Some(shape.id), outcome.shape);

    let label = &t.labels[0];
    assert_eq!(label.text, "North");
    assert_eq!(label.style.angle, 45.0);
    assert_eq!(label.style.font_size, 14.0);
    assert!(approx(label.anchor, centroid(&shape.geometry)));
    assert_eq!(shape.label, Some(label.id));
    assert_eq!(label.shape, Some(shape.id));

    assert!(!session.is_drawing());
    assert!(session.preview().is_none());
    assert_eq!(dialogs.asked, vec![("Name of this territory:".to_string(), "Territory 1".to_string())]);
}

#[test]
fn test_commit_kind_follows_vertex_count() {
    for (n, kind) in [(1, ShapeKind::Point), (2, ShapeKind::Line), (3, ShapeKind::Polygon), (7, ShapeKind::Polygon)] {
        let mut session = SessionState::new();
        session.start_drawing().unwrap();
        for p in triangle().iter().cycle().take(n) {
            session.add_vertex(*p).unwrap();
        }
        session.save_shape(&mut ScriptedDialogs::new()).unwrap();
        assert_eq!(session.territories().shapes[0].kind(), kind, "{n} vertices");
    }
}

#[test]
fn test_undo_count_over_generated_sequences() {
    // Each bit of `pattern` picks append (1) or undo (0) for one step
    for len in 1..=8u32 {
        for pattern in 0..(1u32 << len) {
            let mut session = SessionState::new();
            session.start_drawing().unwrap();
            let mut expected = 0usize;
            for step in 0..len {
                if pattern & (1 << step) != 0 {
                    let p = triangle()[step as usize % 3];
                    assert_eq!(session.add_vertex(p).unwrap(), expected + 1);
                    expected += 1;
                } else {
                    expected = expected.saturating_sub(1);
                    assert_eq!(session.undo_vertex().unwrap(), expected);
                }
            }
            assert_eq!(session.draft().map(|d| d.len()), Some(expected), "pattern {pattern:b} of length {len}");
            assert_eq!(session.preview().is_some(), expected > 0);
        }
    }
}

#[test]
fn test_undo_arithmetic() {
    let mut session = SessionState::new();
    session.start_drawing().unwrap();
    for p in triangle() {
        session.add_vertex(p).unwrap();
    }
    assert_eq!(session.undo_vertex().unwrap(), 2);
    assert_eq!(session.preview().map(|p| p.geometry.kind()), Some(ShapeKind::Line));
    assert_eq!(session.undo_vertex().unwrap(), 1);
    assert_eq!(session.undo_vertex().unwrap(), 0);
    assert!(session.preview().is_none());
    // Undo on an empty draft is a no-op
    assert_eq!(session.undo_vertex().unwrap(), 0);
    assert!(session.is_drawing());
}

#[test]
fn test_operations_outside_drawing_are_rejected() {
    let mut session = SessionState::new();
    assert_eq!(session.add_vertex(triangle()[0]), Err(DrawError::NotDrawing));
    assert_eq!(session.undo_vertex(), Err(DrawError::NotDrawing));
    assert_eq!(session.save_shape(&mut ScriptedDialogs::new()), Err(DrawError::NotDrawing));
    assert!(!session.cancel_drawing());

    session.start_drawing().unwrap();
    assert_eq!(session.start_drawing(), Err(DrawError::AlreadyDrawing));
}

#[test]
fn test_empty_draft_without_label_is_rejected() {
    let mut session = SessionState::new();
    session.start_drawing().unwrap();
    assert_eq!(session.save_shape(&mut ScriptedDialogs::new()), Err(DrawError::EmptyDraft));
    assert!(session.is_drawing());
    assert!(session.territories().is_empty());
}

#[test]
fn test_empty_draft_with_label_places_it_at_view_center() {
    let mut session = SessionState::new();
    let center = GeoPoint::new(40.0, -3.7);
    session.set_view(center, 12.0);
    session.start_drawing().unwrap();
    session.label_inputs.text = "Meeting point".into();

    let outcome = session.save_shape(&mut ScriptedDialogs::new()).unwrap();
    assert!(outcome.shape.is_none());
    let label = &session.territories().labels[0];
    assert_eq!(label.anchor, center);
    assert_eq!(label.shape, None);
}

#[test]
fn test_blank_or_cancelled_name_uses_default() {
    let mut session = SessionState::new();
    let mut dialogs = ScriptedDialogs::new().answer_prompt(Some("   ")).answer_prompt(None);
    for _ in 0..2 {
        session.start_drawing().unwrap();
        session.add_vertex(triangle()[0]).unwrap();
        session.save_shape(&mut dialogs).unwrap();
    }
    let names: Vec<_> = session.territories().shapes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Territory 1", "Territory 2"]);
}

#[test]
fn test_start_resets_label_inputs() {
    let mut session = SessionState::new();
    session.label_inputs = LabelInputs {
        text: "stale".into(),
        angle: 90.0,
        font_size: 30.0,
    };
    session.start_drawing().unwrap();
    assert_eq!(session.label_inputs, LabelInputs::default());
}

#[test]
fn test_cancel_discards_draft() {
    let mut session = SessionState::new();
    session.start_drawing().unwrap();
    session.add_vertex(triangle()[0]).unwrap();
    assert!(session.cancel_drawing());
    assert!(session.draft().is_none());
    assert!(session.preview().is_none());
    assert!(session.territories().is_empty());
}

#[test]
fn test_commit_then_reset_clears_everything() {
    let mut session = SessionState::new();
    commit_triangle(&mut session, "Lot A", "North");
    session.set_color(Color::rgb(0, 128, 0));
    session.set_bearing(30.0);

    let mut dialogs = ScriptedDialogs::new().answer_confirm(true);
    assert!(session.reset_all(&mut dialogs));
    assert!(session.territories().is_empty());
    assert_eq!(session.color(), Color::default());
    assert_eq!(*session.view(), MapView::default());
}

#[test]
fn test_declined_reset_changes_nothing() {
    let mut session = SessionState::new();
    commit_triangle(&mut session, "Lot A", "North");
    let before = session.territories().clone();

    let mut dialogs = ScriptedDialogs::new().answer_confirm(false);
    assert!(!session.reset_all(&mut dialogs));
    assert_eq!(session.territories(), &before);
}

#[test]
fn test_committed_colour_is_a_snapshot() {
    let mut session = SessionState::new();
    session.set_color(Color::rgb(255, 0, 0));
    commit_triangle(&mut session, "Red", "");
    session.set_color(Color::rgb(0, 0, 255));
    assert_eq!(session.territories().shapes[0].stroke_color, Color::rgb(255, 0, 0));
}

#[test]
fn test_preview_follows_colour_change() {
    let mut session = SessionState::new();
    session.start_drawing().unwrap();
    session.add_vertex(triangle()[0]).unwrap();
    session.add_vertex(triangle()[1]).unwrap();
    let preview = session.preview().unwrap();
    assert_eq!(preview.style.dash, Some(constants::DRAFT_DASH));

    session.set_color(Color::rgb(0, 200, 0));
    assert_eq!(session.preview().unwrap().style.stroke, Color::rgb(0, 200, 0));
}

#[test]
fn test_drag_moves_shape_and_label() {
    let mut session = SessionState::new();
    let outcome = commit_triangle(&mut session, "Lot A", "North");
    let id = outcome.shape.unwrap();
    let mut dialogs = ScriptedDialogs::new();

    let from = triangle()[0];
    let to = GeoPoint::new(from.lat + 0.01, from.lon - 0.02);
    assert_eq!(
        session.handle_pointer(PointerEvent::Down { at: from, target: HitTarget::Shape(id) }, &mut dialogs),
        PointerOutcome::DragStarted(id)
    );
    assert_eq!(session.handle_pointer(PointerEvent::Move { at: to }, &mut dialogs), PointerOutcome::Dragged);
    assert_eq!(session.handle_pointer(PointerEvent::Up { at: to }, &mut dialogs), PointerOutcome::DragEnded(id));

    let shape = session.territories().shape(id).unwrap();
    let moved = shape.geometry.vertices();
    for (before, after) in triangle().iter().zip(&moved) {
        assert!((after.lat - before.lat - 0.01).abs() < 1e-9);
        assert!((after.lon - before.lon + 0.02).abs() < 1e-9);
    }
    let label = session.territories().label(outcome.label.unwrap()).unwrap();
    assert!(approx(label.anchor, centroid(&shape.geometry)));
    assert!(session.dragging().is_none());
}

#[test]
fn test_release_over_vanished_shape_ends_drag() {
    let mut session = SessionState::new();
    let id = commit_triangle(&mut session, "Lot A", "").shape.unwrap();
    let mut dialogs = ScriptedDialogs::new();

    let from = triangle()[0];
    session.handle_pointer(PointerEvent::Down { at: from, target: HitTarget::Shape(id) }, &mut dialogs);
    session.territories.remove_shape(id);
    assert_eq!(
        session.handle_pointer(PointerEvent::Up { at: from }, &mut dialogs),
        PointerOutcome::Ignored
    );
    assert!(session.dragging().is_none());
}

#[test]
fn test_clicks_during_drag_do_not_add_vertices() {
    let mut session = SessionState::new();
    let id = commit_triangle(&mut session, "Lot A", "").shape.unwrap();
    session.start_drawing().unwrap();
    let mut dialogs = ScriptedDialogs::new();

    session.handle_pointer(PointerEvent::Down { at: triangle()[0], target: HitTarget::Shape(id) }, &mut dialogs);
    let outcome = session.handle_pointer(PointerEvent::Click { at: triangle()[1], target: HitTarget::Map }, &mut dialogs);
    assert_eq!(outcome, PointerOutcome::Ignored);
    assert_eq!(session.draft().map(DraftPath::len), Some(0));

    session.handle_pointer(PointerEvent::Up { at: triangle()[0] }, &mut dialogs);
    let outcome = session.handle_pointer(PointerEvent::Click { at: triangle()[1], target: HitTarget::Map }, &mut dialogs);
    assert_eq!(outcome, PointerOutcome::VertexAdded(1));
}

#[test]
fn test_clicks_on_shapes_or_controls_are_not_vertices() {
    let mut session = SessionState::new();
    let id = commit_triangle(&mut session, "Lot A", "").shape.unwrap();
    session.start_drawing().unwrap();
    let mut dialogs = ScriptedDialogs::new();

    for target in [HitTarget::Shape(id), HitTarget::Control] {
        let outcome = session.handle_pointer(PointerEvent::Click { at: triangle()[0], target }, &mut dialogs);
        assert_eq!(outcome, PointerOutcome::Ignored);
    }
    assert_eq!(session.draft().map(DraftPath::len), Some(0));
}

#[test]
fn test_label_click_edits_text() {
    let mut session = SessionState::new();
    let label = commit_triangle(&mut session, "Lot A", "North").label.unwrap();
    let mut dialogs = ScriptedDialogs::new().answer_prompt(Some("South"));

    let outcome = session.handle_pointer(
        PointerEvent::Click { at: triangle()[0], target: HitTarget::Label(label) },
        &mut dialogs,
    );
    assert_eq!(outcome, PointerOutcome::LabelEdited(LabelEdit::Renamed));
    assert_eq!(session.territories().label(label).unwrap().text, "South");
    assert_eq!(dialogs.asked[0], ("Edit label text:".to_string(), "North".to_string()));
}

#[test]
fn test_blank_label_edit_deletes_only_when_enabled() {
    let mut session = SessionState::new();
    let outcome = commit_triangle(&mut session, "Lot A", "North");
    let label = outcome.label.unwrap();

    let mut dialogs = ScriptedDialogs::new().answer_prompt(Some(""));
    assert_eq!(session.edit_label(label, &mut dialogs), Ok(LabelEdit::Unchanged));
    assert!(session.territories().label(label).is_some());

    session.delete_label_on_empty_text = true;
    let mut dialogs = ScriptedDialogs::new().answer_prompt(Some(""));
    assert_eq!(session.edit_label(label, &mut dialogs), Ok(LabelEdit::Deleted));
    assert!(session.territories().label(label).is_none());
    assert_eq!(session.territories().shape(outcome.shape.unwrap()).unwrap().label, None);
}

#[test]
fn test_restyle_keeps_identity_and_anchor() {
    let mut session = SessionState::new();
    let label = commit_triangle(&mut session, "Lot A", "North").label.unwrap();
    let anchor = session.territories().label(label).unwrap().anchor;

    let style = LabelStyle { angle: 90.0, font_size: 20.0, color: Color::rgb(1, 2, 3) };
    session.restyle_label(label, style).unwrap();
    let record = session.territories().label(label).unwrap();
    assert_eq!(record.style, style);
    assert_eq!(record.anchor, anchor);
}

#[test]
fn test_delete_shape_cascades_by_default() {
    let mut session = SessionState::new();
    let outcome = commit_triangle(&mut session, "Lot A", "North");
    session.delete_shape(outcome.shape.unwrap()).unwrap();
    assert!(session.territories().is_empty());
}

#[test]
fn test_delete_shape_can_orphan_label() {
    let mut session = SessionState::new();
    session.label_cascade = LabelCascade::Orphan;
    let outcome = commit_triangle(&mut session, "Lot A", "North");
    session.delete_shape(outcome.shape.unwrap()).unwrap();

    let t = session.territories();
    assert!(t.shapes.is_empty());
    assert_eq!(t.labels.len(), 1);
    assert_eq!(t.labels[0].shape, None);
}

#[test]
fn test_unknown_ids_are_reported() {
    let mut session = SessionState::new();
    let id = uuid::Uuid::new_v4();
    assert_eq!(session.delete_shape(id), Err(DrawError::UnknownShape(id)));
    assert_eq!(session.delete_label(id), Err(DrawError::UnknownLabel(id)));
    assert_eq!(session.begin_drag(id, triangle()[0]), Err(DrawError::UnknownShape(id)));
}

#[test]
fn test_control_states() {
    let mut session = SessionState::new();
    let idle = session.controls();
    assert!(idle.start && !idle.undo && !idle.save && !idle.cancel);
    assert!(!idle.reset && !idle.export_image && !idle.export_document);

    session.start_drawing().unwrap();
    let drawing = session.controls();
    assert!(!drawing.start && drawing.undo && drawing.save && drawing.cancel && drawing.reset);
    assert!(!drawing.export_image);

    session.add_vertex(triangle()[0]).unwrap();
    session.save_shape(&mut ScriptedDialogs::new()).unwrap();
    let committed = session.controls();
    assert!(committed.start && committed.reset && committed.export_image && committed.export_document);

    let _job = session.begin_export(crate::export::ExportFormat::Image).unwrap().unwrap();
    assert!(!session.controls().export_document);
}

#[test]
fn test_bearing_is_normalised() {
    let mut session = SessionState::new();
    session.set_bearing(-30.0);
    assert_eq!(session.view().bearing, 330.0);
    session.set_bearing(720.0);
    assert_eq!(session.view().bearing, 0.0);
    session.set_bearing(f64::NAN);
    assert_eq!(session.view().bearing, 0.0);
}
