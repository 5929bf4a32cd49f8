//! Measure and layout passes.
//!
//! Measure runs bottom-up: each node resolves its own size from its
//! [`Dimension`](trellis_geometry::Dimension) policy and the constraint handed
//! down by the parent, measuring children against a padding-deflated child
//! constraint first when either axis is `Auto`. Layout runs top-down and only
//! assigns offsets; child offsets are relative to the parent's content origin.
//! Both passes are idempotent for unchanged inputs.

use log::trace;
use trellis_geometry::{
    Alignment, Axis, LayoutConstraint, Offset, Rect, Size, TextDirection,
};

use crate::node::{ListMeasureCache, NodeId, NodeKind};
use crate::property::{CrossAxisAlignment, DirtyFlags, FlexArrangement, Visibility};
use crate::tree::UiTree;

/// Measures the subtree rooted at `id` under `constraint` and returns the
/// node's frame size. A stale id measures to zero.
pub fn measure(tree: &mut UiTree, id: NodeId, constraint: LayoutConstraint) -> Size {
    let Some(node) = tree.node(id) else {
        return Size::ZERO;
    };
    if node.layout.visibility == Visibility::Gone || !node.is_active() {
        if let Some(node) = tree.node_mut(id) {
            node.geometry.frame_size = Size::ZERO;
            node.geometry.content_rect = None;
        }
        tree.clear_dirty(id, DirtyFlags::NEEDS_MEASURE);
        return Size::ZERO;
    }

    let kind = node.kind;
    let padding = node.layout.padding;
    let item_spacing = node.layout.item_spacing.max(0.0);
    let resolved_width = node.layout.width.resolve(constraint.max.width);
    let resolved_height = node.layout.height.resolve(constraint.max.height);
    let children = tree.children_of(id);

    // Constraint for children: the space left inside padding, with any
    // resolved own extent taking precedence over the parent-provided max.
    let own_max = Size::new(
        resolved_width.unwrap_or(constraint.max.width),
        resolved_height.unwrap_or(constraint.max.height),
    );
    let inner = LayoutConstraint::loose(own_max).deflate(padding);

    let content = match kind {
        NodeKind::Leaf => Size::ZERO,
        NodeKind::Stack => {
            let mut content = Size::ZERO;
            for child in children {
                content = content.max(measure(tree, child, inner));
            }
            content
        }
        NodeKind::Flex { axis } => measure_linear(tree, &children, inner, axis, 0.0).0,
        NodeKind::List { axis } => {
            let child_constraint = LayoutConstraint {
                min: Size::ZERO,
                max: axis.pack(f32::INFINITY, axis.cross(inner.max)),
            };
            let (content, cache) =
                measure_linear(tree, &children, child_constraint, axis, item_spacing);
            if let Some(node) = tree.node_mut(id) {
                node.list_cache = Some(cache);
            }
            content
        }
    };

    let auto = Size::new(
        content.width + padding.horizontal_sum(),
        content.height + padding.vertical_sum(),
    );
    let frame_size = constraint
        .constrain(Size::new(
            resolved_width.unwrap_or(auto.width),
            resolved_height.unwrap_or(auto.height),
        ))
        .clamped();

    if let Some(node) = tree.node_mut(id) {
        node.geometry.frame_size = frame_size;
        node.geometry.content_rect =
            Some(Rect::new(padding.top_left(), frame_size.deflate(padding)));
    }
    tree.clear_dirty(id, DirtyFlags::NEEDS_MEASURE);
    trace!("measured {id} -> {frame_size}");
    frame_size
}

/// Sequential measure along `axis`, summing main extents with `spacing` gaps
/// and taking the max across. `Gone` children contribute nothing. Returns the
/// content size and the per-item extent cache.
fn measure_linear(
    tree: &mut UiTree,
    children: &[NodeId],
    constraint: LayoutConstraint,
    axis: Axis,
    spacing: f32,
) -> (Size, ListMeasureCache) {
    let mut main = 0.0f32;
    let mut cross = 0.0f32;
    let mut extents = Vec::with_capacity(children.len());
    let mut placed = 0usize;
    for &child in children {
        let size = measure(tree, child, constraint);
        let gone = tree
            .node(child)
            .map(|n| n.layout.visibility == Visibility::Gone || !n.is_active())
            .unwrap_or(true);
        if gone {
            extents.push(0.0);
            continue;
        }
        if placed > 0 {
            main += spacing;
        }
        main += axis.main(size);
        cross = cross.max(axis.cross(size));
        extents.push(axis.main(size));
        placed += 1;
    }
    let cache = ListMeasureCache {
        item_extents: extents,
        total_main: main,
    };
    (axis.pack(main, cross), cache)
}

/// Positions the children of the subtree rooted at `id`.
///
/// `inherited` is the effective text direction of the parent chain; a node
/// with an explicit `Ltr`/`Rtl` direction overrides it for its subtree. RTL
/// mirrors child x positions within the parent's content width after normal
/// placement.
pub fn layout(tree: &mut UiTree, id: NodeId, inherited: TextDirection) {
    let Some(node) = tree.node(id) else {
        return;
    };
    if node.layout.visibility == Visibility::Gone || !node.is_active() {
        tree.clear_dirty(id, DirtyFlags::NEEDS_LAYOUT);
        return;
    }
    let direction = match node.layout.direction {
        TextDirection::Auto => inherited,
        explicit => explicit,
    };
    let kind = node.kind;
    let alignment = node.layout.alignment.unwrap_or(Alignment::CENTER);
    let arrangement = node.layout.main_arrangement;
    let cross_alignment = node.layout.cross_alignment;
    let item_spacing = node.layout.item_spacing.max(0.0);
    let content = node.geometry.content().size;
    let children = tree.children_of(id);

    match kind {
        NodeKind::Leaf => {}
        NodeKind::Stack => {
            for &child in &children {
                let Some(size) = visible_size(tree, child) else {
                    continue;
                };
                let offset = alignment.align(content, size);
                place(tree, child, offset, content, size, direction);
            }
        }
        NodeKind::Flex { axis } => {
            place_linear(
                tree,
                &children,
                axis,
                content,
                arrangement,
                cross_alignment,
                0.0,
                direction,
            );
        }
        NodeKind::List { axis } => {
            place_linear(
                tree,
                &children,
                axis,
                content,
                FlexArrangement::Start,
                cross_alignment,
                item_spacing,
                direction,
            );
        }
    }

    for child in children {
        layout(tree, child, direction);
    }
    tree.clear_dirty(id, DirtyFlags::NEEDS_LAYOUT);
}

fn visible_size(tree: &UiTree, id: NodeId) -> Option<Size> {
    let node = tree.node(id)?;
    if node.layout.visibility == Visibility::Gone || !node.is_active() {
        return None;
    }
    Some(node.geometry.frame_size)
}

/// Writes a child's offset, mirroring x for RTL.
fn place(
    tree: &mut UiTree,
    child: NodeId,
    offset: Offset,
    content: Size,
    child_size: Size,
    direction: TextDirection,
) {
    let x = if direction == TextDirection::Rtl {
        content.width - offset.x - child_size.width
    } else {
        offset.x
    };
    if let Some(node) = tree.node_mut(child) {
        node.geometry.frame_offset = Offset::new(x, offset.y);
    }
}

#[allow(clippy::too_many_arguments)]
fn place_linear(
    tree: &mut UiTree,
    children: &[NodeId],
    axis: Axis,
    content: Size,
    arrangement: FlexArrangement,
    cross_alignment: CrossAxisAlignment,
    spacing: f32,
    direction: TextDirection,
) {
    let sizes: Vec<Option<Size>> = children
        .iter()
        .map(|&child| visible_size(tree, child))
        .collect();
    let placed = sizes.iter().flatten().count();
    if placed == 0 {
        return;
    }
    let total: f32 = sizes.iter().flatten().map(|s| axis.main(*s)).sum::<f32>()
        + spacing * (placed as f32 - 1.0);
    let available = axis.main(content);
    let free = (available - total).max(0.0);

    let (mut cursor, gap) = match arrangement {
        FlexArrangement::Start => (0.0, spacing),
        FlexArrangement::Center => (free / 2.0, spacing),
        FlexArrangement::End => (free, spacing),
        FlexArrangement::SpaceBetween => {
            if placed > 1 {
                (0.0, spacing + free / (placed as f32 - 1.0))
            } else {
                (free / 2.0, spacing)
            }
        }
    };

    for (&child, size) in children.iter().zip(&sizes) {
        let Some(size) = size else {
            continue;
        };
        let cross_free = (axis.cross(content) - axis.cross(*size)).max(0.0);
        let cross_pos = match cross_alignment {
            CrossAxisAlignment::Start => 0.0,
            CrossAxisAlignment::Center => cross_free / 2.0,
            CrossAxisAlignment::End => cross_free,
        };
        let offset = match axis {
            Axis::Horizontal => Offset::new(cursor, cross_pos),
            Axis::Vertical => Offset::new(cross_pos, cursor),
        };
        place(tree, child, offset, content, *size, direction);
        cursor += axis.main(*size) + gap;
    }
}
