//! End-to-end pipeline tests: property updates through measure, layout, and
//! paint collection via the public facade.

use trellis::prelude::*;
use trellis::{Border, Canvas, Color, FlexArrangement, Visibility};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_context(width: f32, height: f32) -> PipelineContext {
    init_logging();
    PipelineContext::new(Size::new(width, height))
}

fn sized_node(ctx: &mut PipelineContext, kind: NodeKind, w: f32, h: f32) -> NodeId {
    let id = ctx.tree_mut().create_node(kind);
    ctx.apply_update(id, PropertyUpdate::Width(Dimension::Px(w)));
    ctx.apply_update(id, PropertyUpdate::Height(Dimension::Px(h)));
    id
}

#[test]
fn stack_centers_two_children() {
    let mut ctx = new_context(200.0, 200.0);
    let root = sized_node(&mut ctx, NodeKind::Stack, 200.0, 200.0);
    let a = sized_node(&mut ctx, NodeKind::Leaf, 100.0, 100.0);
    let b = sized_node(&mut ctx, NodeKind::Leaf, 50.0, 50.0);
    ctx.tree_mut().set_root(root);
    ctx.tree_mut().add_child(root, a);
    ctx.tree_mut().add_child(root, b);

    ctx.flush_frame();

    let offset_a = ctx.tree().node(a).unwrap().geometry.frame_offset;
    let offset_b = ctx.tree().node(b).unwrap().geometry.frame_offset;
    assert_eq!(offset_a, Offset::new(50.0, 50.0));
    assert_eq!(offset_b, Offset::new(75.0, 75.0));
}

#[test]
fn child_frame_stays_within_parent_content() {
    let mut ctx = new_context(300.0, 300.0);
    let root = sized_node(&mut ctx, NodeKind::Stack, 300.0, 300.0);
    ctx.apply_update(root, PropertyUpdate::Padding(EdgeInsets::uniform(20.0)));
    let child = sized_node(&mut ctx, NodeKind::Leaf, 100.0, 100.0);
    ctx.tree_mut().set_root(root);
    ctx.tree_mut().add_child(root, child);

    ctx.flush_frame();

    let content = ctx.tree().node(root).unwrap().geometry.content();
    let child_rect = ctx
        .tree()
        .node(child)
        .unwrap()
        .geometry
        .frame_rect()
        .translate(content.origin);
    assert!(content.contains_rect(child_rect));
}

#[test]
fn rtl_direction_mirrors_start_aligned_child() {
    let mut ctx = new_context(200.0, 100.0);
    ctx.set_direction(TextDirection::Rtl);
    let root = sized_node(&mut ctx, NodeKind::Stack, 200.0, 100.0);
    ctx.apply_update(root, PropertyUpdate::Alignment(Some(Alignment::TOP_START)));
    let child = sized_node(&mut ctx, NodeKind::Leaf, 40.0, 40.0);
    ctx.tree_mut().set_root(root);
    ctx.tree_mut().add_child(root, child);

    ctx.flush_frame();
    assert_eq!(
        ctx.tree().node(child).unwrap().geometry.frame_offset,
        Offset::new(160.0, 0.0)
    );
}

#[test]
fn flex_column_relayouts_after_visibility_change() {
    let mut ctx = new_context(100.0, 300.0);
    let root = ctx.tree_mut().create_node(NodeKind::Flex {
        axis: Axis::Vertical,
    });
    ctx.apply_update(root, PropertyUpdate::Width(Dimension::Fill));
    ctx.apply_update(root, PropertyUpdate::Height(Dimension::Fill));
    ctx.apply_update(root, PropertyUpdate::MainArrangement(FlexArrangement::Start));
    let a = sized_node(&mut ctx, NodeKind::Leaf, 100.0, 50.0);
    let b = sized_node(&mut ctx, NodeKind::Leaf, 100.0, 50.0);
    ctx.tree_mut().set_root(root);
    ctx.tree_mut().add_child(root, a);
    ctx.tree_mut().add_child(root, b);

    ctx.flush_frame();
    assert_eq!(ctx.tree().node(b).unwrap().geometry.frame_offset.y, 50.0);

    ctx.apply_update(a, PropertyUpdate::Visibility(Visibility::Gone));
    ctx.flush_frame();
    assert_eq!(ctx.tree().node(b).unwrap().geometry.frame_offset.y, 0.0);
}

#[derive(Default)]
struct RecordingCanvas {
    fills: Vec<(Rect, Color)>,
    strokes: Vec<(Rect, Border)>,
    clip_depth: i32,
    max_clip_depth: i32,
}

impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Color, _corner_radius: f32) {
        self.fills.push((rect, color));
    }

    fn stroke_rect(&mut self, rect: Rect, border: Border, _corner_radius: f32) {
        self.strokes.push((rect, border));
    }

    fn push_clip(&mut self, _rect: Rect) {
        self.clip_depth += 1;
        self.max_clip_depth = self.max_clip_depth.max(self.clip_depth);
    }

    fn pop_clip(&mut self) {
        self.clip_depth -= 1;
    }
}

#[test]
fn paint_commands_replay_in_absolute_coordinates() {
    let mut ctx = new_context(200.0, 200.0);
    let root = sized_node(&mut ctx, NodeKind::Stack, 200.0, 200.0);
    ctx.apply_update(root, PropertyUpdate::Padding(EdgeInsets::uniform(10.0)));
    ctx.apply_update(
        root,
        PropertyUpdate::Background(Some(Color(0.1, 0.1, 0.1, 1.0))),
    );
    let child = sized_node(&mut ctx, NodeKind::Leaf, 60.0, 60.0);
    ctx.apply_update(
        child,
        PropertyUpdate::Background(Some(Color(0.9, 0.2, 0.2, 1.0))),
    );
    ctx.apply_update(
        child,
        PropertyUpdate::BorderStroke(Some(Border {
            width: 2.0,
            color: Color(0.0, 0.0, 0.0, 1.0),
        })),
    );
    ctx.tree_mut().set_root(root);
    ctx.tree_mut().add_child(root, child);

    let list = ctx.flush_frame();
    let mut canvas = RecordingCanvas::default();
    list.replay(&mut canvas);

    assert_eq!(canvas.fills.len(), 2);
    // Child is centered in the 180x180 content rect, shifted by the padding.
    let (child_rect, _) = canvas.fills[1];
    assert_eq!(child_rect.origin, Offset::new(70.0, 70.0));
    assert_eq!(canvas.strokes.len(), 1);
    assert_eq!(canvas.clip_depth, 0);
    assert_eq!(canvas.max_clip_depth, 1);
}

#[test]
fn command_list_outlives_tree_changes() {
    let mut ctx = new_context(100.0, 100.0);
    let root = sized_node(&mut ctx, NodeKind::Stack, 100.0, 100.0);
    ctx.apply_update(
        root,
        PropertyUpdate::Background(Some(Color(0.5, 0.5, 0.5, 1.0))),
    );
    ctx.tree_mut().set_root(root);

    let list = ctx.flush_frame();
    assert!(!list.is_empty());
    ctx.tree_mut().remove_node(root);

    let mut canvas = RecordingCanvas::default();
    list.replay(&mut canvas);
    assert_eq!(canvas.fills.len(), 1);
}

#[test]
fn repeated_flushes_are_stable() {
    let mut ctx = new_context(200.0, 200.0);
    let root = sized_node(&mut ctx, NodeKind::Stack, 200.0, 200.0);
    let child = sized_node(&mut ctx, NodeKind::Leaf, 80.0, 80.0);
    ctx.tree_mut().set_root(root);
    ctx.tree_mut().add_child(root, child);

    ctx.flush_frame();
    let first = ctx.tree().node(child).unwrap().geometry;

    // A paint-only change must not move geometry.
    ctx.apply_update(
        child,
        PropertyUpdate::Background(Some(Color(0.0, 0.0, 1.0, 1.0))),
    );
    ctx.flush_frame();
    assert_eq!(ctx.tree().node(child).unwrap().geometry, first);
}

#[test]
fn frame_hook_schedules_once_per_batch() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut ctx = new_context(100.0, 100.0);
    let requests = Rc::new(Cell::new(0));
    let hook = requests.clone();
    ctx.set_frame_request_hook(Box::new(move || hook.set(hook.get() + 1)));

    let root = ctx.tree_mut().create_node(NodeKind::Stack);
    ctx.tree_mut().set_root(root);
    ctx.apply_update(root, PropertyUpdate::Width(Dimension::Fill));
    ctx.apply_update(root, PropertyUpdate::Height(Dimension::Fill));
    assert_eq!(requests.get(), 1);

    ctx.flush_frame();
    ctx.apply_update(root, PropertyUpdate::Alpha(0.5));
    assert_eq!(requests.get(), 2);
}
