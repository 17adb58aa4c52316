use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{
    Animation, AnimationId, Easing, HostRequest, NodeId, NodeProps, PreparedSvg, Renderer,
    TextSpec,
};
use crate::color::Color;
use crate::layout::{Rect, Size};

/// Flat-color rectangles start at this size until something resizes them.
const DEFAULT_RECT_SIZE: f32 = 100.0;
/// Camera distance as a fraction of the stage height (60° vertical field of view).
const CAMERA_DISTANCE: f32 = 0.866;

/// Measures the natural size of a text block.
pub trait TextMeasure {
    fn measure(&self, text: &TextSpec) -> Size;
}

/// Font-metric-free estimate: fixed advance per character, 1.2 line height.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMeasure;

impl TextMeasure for EstimatedMeasure {
    fn measure(&self, text: &TextSpec) -> Size {
        let advance = if text.font.is_monospace() { 0.6 } else { 0.5 };
        let px = text.font.size_px;
        let lines: Vec<&str> = text.text.split('\n').collect();
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        Size::new(
            widest as f32 * px * advance,
            lines.len() as f32 * px * 1.2,
        )
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Stage,
    Container,
    Rectangle,
    Text(TextSpec),
    Image(PathBuf),
    Video(PathBuf),
    VectorScene(PreparedSvg),
}

/// Fully resolved node properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Props {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub opacity: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
}

impl Default for Props {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            depth: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            width: 0.0,
            height: 0.0,
            color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    X,
    Y,
    Depth,
    ScaleX,
    ScaleY,
    Opacity,
    Width,
    Height,
    Color,
}

impl Props {
    fn get(&self, field: Field) -> f32 {
        match field {
            Field::X => self.x,
            Field::Y => self.y,
            Field::Depth => self.depth,
            Field::ScaleX => self.scale_x,
            Field::ScaleY => self.scale_y,
            Field::Opacity => self.opacity,
            Field::Width => self.width,
            Field::Height => self.height,
            Field::Color => 0.0,
        }
    }

    fn set(&mut self, field: Field, value: f32) {
        match field {
            Field::X => self.x = value,
            Field::Y => self.y = value,
            Field::Depth => self.depth = value,
            Field::ScaleX => self.scale_x = value,
            Field::ScaleY => self.scale_y = value,
            Field::Opacity => self.opacity = value.clamp(0.0, 1.0),
            Field::Width => self.width = value,
            Field::Height => self.height = value,
            Field::Color => {}
        }
    }

    fn apply(&mut self, props: &NodeProps) {
        for (field, value) in float_fields(props) {
            self.set(field, value);
        }
        if let Some(color) = props.color {
            self.color = color;
        }
    }
}

fn float_fields(props: &NodeProps) -> impl Iterator<Item = (Field, f32)> {
    [
        (Field::X, props.x),
        (Field::Y, props.y),
        (Field::Depth, props.depth),
        (Field::ScaleX, props.scale_x),
        (Field::ScaleY, props.scale_y),
        (Field::Opacity, props.opacity),
        (Field::Width, props.width),
        (Field::Height, props.height),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.map(|v| (field, v)))
}

fn touched_fields(props: &NodeProps) -> Vec<Field> {
    let mut fields: Vec<Field> = float_fields(props).map(|(f, _)| f).collect();
    if props.color.is_some() {
        fields.push(Field::Color);
    }
    fields
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub props: Props,
    pub visible: bool,
    pub playing: bool,
    /// Playback position of time-based media.
    pub position: Duration,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>, props: Props) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            props,
            visible: true,
            playing: false,
            position: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct Tween {
    id: AnimationId,
    node: NodeId,
    start: Duration,
    duration: Duration,
    easing: Easing,
    channels: Vec<(Field, f32, f32)>,
    color: Option<(Color, Color)>,
}

impl Tween {
    fn drop_fields(&mut self, fields: &[Field]) {
        self.channels.retain(|(f, _, _)| !fields.contains(f));
        if fields.contains(&Field::Color) {
            self.color = None;
        }
    }

    fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.color.is_none()
    }
}

/// Comparable per-node state, used to tell whether anything changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeState {
    pub parent: Option<NodeId>,
    pub props: Props,
    pub visible: bool,
    pub playing: bool,
}

/// One drawable primitive with its stage-space geometry after perspective.
#[derive(Debug, Clone)]
pub struct DrawItem<'a> {
    pub node: NodeId,
    pub kind: &'a NodeKind,
    pub rect: Rect,
    /// Combined scale applied to the node's natural size, per axis.
    pub scale_x: f32,
    pub scale_y: f32,
    pub opacity: f32,
    pub color: Color,
    pub position: Duration,
}

#[derive(Debug, Clone, Copy)]
struct World {
    x: f32,
    y: f32,
    scale_x: f32,
    scale_y: f32,
    depth: f32,
    opacity: f32,
}

/// A retained scene graph with property tweening.
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
    stage_size: Size,
    stage_color: Color,
    clock: Duration,
    tweens: Vec<Tween>,
    superseded: Vec<AnimationId>,
    next_node: u64,
    next_animation: u64,
    animations_started: u64,
    measure: Box<dyn TextMeasure>,
    requests: Vec<HostRequest>,
}

impl SceneGraph {
    pub fn new(stage_size: Size) -> Self {
        Self::with_measure(stage_size, Box::new(EstimatedMeasure))
    }

    pub fn with_measure(stage_size: Size, measure: Box<dyn TextMeasure>) -> Self {
        let root = NodeId(0);
        let mut nodes = BTreeMap::new();
        let props = Props {
            width: stage_size.width,
            height: stage_size.height,
            ..Props::default()
        };
        nodes.insert(root, Node::new(NodeKind::Stage, None, props));
        Self {
            nodes,
            root,
            stage_size,
            stage_color: Color::BLACK,
            clock: Duration::ZERO,
            tweens: Vec::new(),
            superseded: Vec::new(),
            next_node: 1,
            next_animation: 1,
            animations_started: 0,
            measure,
            requests: Vec::new(),
        }
    }

    /// Returns `true` when the size actually changed.
    pub fn set_stage_size(&mut self, size: Size) -> bool {
        if (size.width - self.stage_size.width).abs() < 0.5
            && (size.height - self.stage_size.height).abs() < 0.5
        {
            return false;
        }
        self.stage_size = size;
        if let Some(stage) = self.nodes.get_mut(&self.root) {
            stage.props.width = size.width;
            stage.props.height = size.height;
        }
        true
    }

    pub fn stage_color(&self) -> Color {
        self.stage_color
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn props(&self, id: NodeId) -> Option<Props> {
        self.nodes.get(&id).map(|n| n.props)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_animating(&self) -> bool {
        !self.tweens.is_empty() || !self.superseded.is_empty()
    }

    pub fn has_playing_media(&self) -> bool {
        self.nodes.values().any(|n| n.playing)
    }

    /// Total number of `animate` calls so far.
    pub fn animations_started(&self) -> u64 {
        self.animations_started
    }

    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn snapshot(&self) -> BTreeMap<NodeId, NodeState> {
        self.nodes
            .iter()
            .map(|(id, n)| {
                (
                    *id,
                    NodeState {
                        parent: n.parent,
                        props: n.props,
                        visible: n.visible,
                        playing: n.playing,
                    },
                )
            })
            .collect()
    }

    /// Advance the clock, apply running tweens and return the animations
    /// that finished or were superseded since the last call.
    pub fn tick(&mut self, dt: Duration) -> Vec<AnimationId> {
        self.clock += dt;
        let mut finished = std::mem::take(&mut self.superseded);

        for node in self.nodes.values_mut() {
            if node.playing {
                node.position += dt;
            }
        }

        let clock = self.clock;
        let nodes = &mut self.nodes;
        self.tweens.retain(|tween| {
            let Some(node) = nodes.get_mut(&tween.node) else {
                finished.push(tween.id);
                return false;
            };
            let elapsed = clock.saturating_sub(tween.start);
            let t = if tween.duration.is_zero() {
                1.0
            } else {
                (elapsed.as_secs_f32() / tween.duration.as_secs_f32()).min(1.0)
            };
            let done = t >= 1.0;
            let k = tween.easing.apply(t);
            for &(field, from, to) in &tween.channels {
                let value = if done { to } else { from + (to - from) * k };
                node.props.set(field, value);
            }
            if let Some((from, to)) = tween.color {
                node.props.color = if done { to } else { from.lerp(to, k) };
            }
            if done {
                finished.push(tween.id);
                false
            } else {
                true
            }
        });

        finished
    }

    /// Run every tween to completion.
    pub fn settle(&mut self) -> Vec<AnimationId> {
        let mut finished = Vec::new();
        while self.is_animating() {
            finished.extend(self.tick(Duration::from_secs(60)));
        }
        finished
    }

    fn insert(&mut self, parent: NodeId, kind: NodeKind, props: Props) -> NodeId {
        let parent = if self.nodes.contains_key(&parent) {
            parent
        } else {
            tracing::warn!(?parent, "unknown parent, attaching to stage");
            self.root
        };
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(kind, Some(parent), props));
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    fn cancel_fields(&mut self, node: NodeId, fields: &[Field]) {
        let superseded = &mut self.superseded;
        self.tweens.retain_mut(|tween| {
            if tween.node != node {
                return true;
            }
            tween.drop_fields(fields);
            if tween.is_empty() {
                superseded.push(tween.id);
                false
            } else {
                true
            }
        });
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get(&node).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
    }

    /// Depth-sorted drawables in paint order, projected onto the stage.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        let mut items = Vec::new();
        let world = World {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            depth: 0.0,
            opacity: 1.0,
        };
        self.collect(self.root, world, &mut items);
        items
    }

    fn collect<'a>(&'a self, id: NodeId, parent: World, items: &mut Vec<DrawItem<'a>>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if !node.visible {
            return;
        }
        let p = &node.props;
        let world = if matches!(node.kind, NodeKind::Stage) {
            parent
        } else {
            World {
                x: parent.x + p.x * parent.scale_x,
                y: parent.y + p.y * parent.scale_y,
                scale_x: parent.scale_x * p.scale_x,
                scale_y: parent.scale_y * p.scale_y,
                depth: parent.depth + p.depth,
                opacity: parent.opacity * p.opacity,
            }
        };
        if world.opacity <= 0.0 {
            return;
        }

        if !matches!(node.kind, NodeKind::Stage | NodeKind::Container) {
            if let Some(item) = self.project(id, node, world) {
                items.push(item);
            }
        }

        let mut children: Vec<(NodeId, f32)> = node
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c).map(|n| (*c, n.props.depth)))
            .collect();
        children.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (child, _) in children {
            self.collect(child, world, items);
        }
    }

    fn project<'a>(&self, id: NodeId, node: &'a Node, world: World) -> Option<DrawItem<'a>> {
        let camera = self.stage_size.height * CAMERA_DISTANCE;
        let distance = camera - world.depth;
        if distance <= 1.0 {
            return None;
        }
        let factor = camera / distance;
        let cx = self.stage_size.width / 2.0;
        let cy = self.stage_size.height / 2.0;

        let scale_x = world.scale_x * factor;
        let scale_y = world.scale_y * factor;
        Some(DrawItem {
            node: id,
            kind: &node.kind,
            rect: Rect {
                x: cx + (world.x - cx) * factor,
                y: cy + (world.y - cy) * factor,
                width: node.props.width * scale_x,
                height: node.props.height * scale_y,
            },
            scale_x,
            scale_y,
            opacity: world.opacity,
            color: node.props.color,
            position: node.position,
        })
    }
}

impl Renderer for SceneGraph {
    fn root(&self) -> NodeId {
        self.root
    }

    fn stage_size(&self) -> Size {
        self.stage_size
    }

    fn set_stage_color(&mut self, color: Color) {
        self.stage_color = color;
    }

    fn create_container(&mut self, parent: NodeId) -> NodeId {
        self.insert(parent, NodeKind::Container, Props::default())
    }

    fn create_rectangle(&mut self, parent: NodeId, color: Color) -> NodeId {
        let props = Props {
            width: DEFAULT_RECT_SIZE,
            height: DEFAULT_RECT_SIZE,
            color,
            ..Props::default()
        };
        self.insert(parent, NodeKind::Rectangle, props)
    }

    fn create_text(&mut self, parent: NodeId, text: &TextSpec) -> NodeId {
        let size = self.measure.measure(text);
        let props = Props {
            width: size.width,
            height: size.height,
            color: text.color,
            ..Props::default()
        };
        self.insert(parent, NodeKind::Text(text.clone()), props)
    }

    fn create_image(&mut self, parent: NodeId, path: &Path, natural: Size) -> NodeId {
        let props = Props {
            width: natural.width,
            height: natural.height,
            ..Props::default()
        };
        self.insert(parent, NodeKind::Image(path.to_path_buf()), props)
    }

    fn create_video(&mut self, parent: NodeId, path: &Path, placeholder: Size) -> NodeId {
        let props = Props {
            width: placeholder.width,
            height: placeholder.height,
            ..Props::default()
        };
        self.insert(parent, NodeKind::Video(path.to_path_buf()), props)
    }

    fn create_vector_scene(&mut self, parent: NodeId, svg: PreparedSvg) -> NodeId {
        let size = svg.tree.size();
        let props = Props {
            width: size.width(),
            height: size.height(),
            ..Props::default()
        };
        self.insert(parent, NodeKind::VectorScene(svg), props)
    }

    fn node_size(&self, node: NodeId) -> Size {
        self.nodes
            .get(&node)
            .map(|n| Size::new(n.props.width, n.props.height))
            .unwrap_or_default()
    }

    fn set_props(&mut self, node: NodeId, props: &NodeProps) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.cancel_fields(node, &touched_fields(props));
        if let Some(n) = self.nodes.get_mut(&node) {
            n.props.apply(props);
        }
    }

    fn animate(&mut self, node: NodeId, animation: &Animation) -> AnimationId {
        let id = AnimationId(self.next_animation);
        self.next_animation += 1;
        self.animations_started += 1;

        let Some(current) = self.props(node) else {
            self.superseded.push(id);
            return id;
        };
        self.cancel_fields(node, &touched_fields(&animation.props));

        let channels = float_fields(&animation.props)
            .map(|(field, to)| (field, current.get(field), to))
            .collect();
        let color = animation.props.color.map(|to| (current.color, to));
        self.tweens.push(Tween {
            id,
            node,
            start: self.clock,
            duration: Duration::from_millis(animation.duration_ms as u64),
            easing: animation.easing,
            channels,
            color,
        });
        id
    }

    fn reparent(&mut self, node: NodeId, from: NodeId, to: NodeId) {
        if node == self.root || !self.nodes.contains_key(&node) || !self.nodes.contains_key(&to) {
            return;
        }
        let actual = self.parent(node);
        if actual != Some(from) {
            tracing::warn!(?node, ?from, ?actual, "reparent source does not own the node");
        }
        self.detach(node);
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = Some(to);
        }
        if let Some(t) = self.nodes.get_mut(&to) {
            t.children.push(node);
        }
    }

    fn raise_top(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
            p.children.push(node);
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.visible = visible;
        }
    }

    fn set_playing(&mut self, node: NodeId, playing: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.playing = playing;
        }
    }

    fn seek_to_start(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.position = Duration::ZERO;
        }
    }

    fn destroy(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                stack.extend(n.children);
            }
        }
        let nodes = &self.nodes;
        let superseded = &mut self.superseded;
        self.tweens.retain(|t| {
            if nodes.contains_key(&t.node) {
                true
            } else {
                superseded.push(t.id);
                false
            }
        });
    }

    fn request(&mut self, request: HostRequest) {
        self.requests.push(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{FontSpec, TextAlign};

    fn scene() -> SceneGraph {
        SceneGraph::new(Size::new(800.0, 600.0))
    }

    #[test]
    fn test_tween_reaches_target_and_reports_completion() {
        let mut s = scene();
        let root = s.root();
        let rect = s.create_rectangle(root, Color::BLACK);
        let id = s.animate(rect, &Animation::linear(1000, NodeProps::new().opacity(0.0)));

        assert!(s.tick(Duration::from_millis(500)).is_empty());
        assert!((s.props(rect).unwrap().opacity - 0.5).abs() < 1e-4);

        let done = s.tick(Duration::from_millis(600));
        assert_eq!(done, vec![id]);
        assert_eq!(s.props(rect).unwrap().opacity, 0.0);
        assert!(!s.is_animating());
    }

    #[test]
    fn test_last_writer_wins_per_property() {
        let mut s = scene();
        let root = s.root();
        let rect = s.create_rectangle(root, Color::BLACK);
        let first = s.animate(rect, &Animation::linear(1000, NodeProps::new().position(100.0, 100.0)));
        let second = s.animate(rect, &Animation::linear(1000, NodeProps::new().position(-50.0, -50.0)));

        let done = s.tick(Duration::from_millis(10));
        assert_eq!(done, vec![first], "superseded tween reports at once");

        let done = s.settle();
        assert_eq!(done, vec![second]);
        let p = s.props(rect).unwrap();
        assert_eq!((p.x, p.y), (-50.0, -50.0));
    }

    #[test]
    fn test_disjoint_animations_coexist() {
        let mut s = scene();
        let root = s.root();
        let rect = s.create_rectangle(root, Color::BLACK);
        s.animate(rect, &Animation::linear(100, NodeProps::new().opacity(0.25)));
        s.animate(rect, &Animation::linear(100, NodeProps::new().depth(-10.0)));
        let done = s.settle();
        assert_eq!(done.len(), 2);
        let p = s.props(rect).unwrap();
        assert_eq!(p.opacity, 0.25);
        assert_eq!(p.depth, -10.0);
    }

    #[test]
    fn test_set_props_cancels_running_tween() {
        let mut s = scene();
        let root = s.root();
        let rect = s.create_rectangle(root, Color::BLACK);
        s.animate(rect, &Animation::linear(1000, NodeProps::new().opacity(0.0)));
        s.set_props(rect, &NodeProps::new().opacity(0.8));
        s.settle();
        assert_eq!(s.props(rect).unwrap().opacity, 0.8);
    }

    #[test]
    fn test_reparent_and_raise() {
        let mut s = scene();
        let root = s.root();
        let a = s.create_container(root);
        let b = s.create_container(root);
        let rect = s.create_rectangle(a, Color::WHITE);

        s.reparent(rect, a, b);
        assert_eq!(s.parent(rect), Some(b));
        assert!(s.children(a).is_empty());
        assert_eq!(s.children(b), &[rect]);

        s.raise_top(a);
        assert_eq!(s.children(root), &[b, a]);
    }

    #[test]
    fn test_destroy_removes_subtree_and_tweens() {
        let mut s = scene();
        let root = s.root();
        let group = s.create_container(root);
        let rect = s.create_rectangle(group, Color::WHITE);
        let anim = s.animate(rect, &Animation::linear(1000, NodeProps::new().opacity(0.0)));

        s.destroy(group);
        assert!(!s.contains(group));
        assert!(!s.contains(rect));
        assert!(s.children(root).is_empty());
        assert_eq!(s.tick(Duration::ZERO), vec![anim]);
    }

    #[test]
    fn test_text_is_measured_on_creation() {
        let mut s = scene();
        let root = s.root();
        let spec = TextSpec {
            text: "Hello\nall".to_string(),
            font: FontSpec::parse("Sans 20px"),
            color: Color::WHITE,
            align: TextAlign::Left,
        };
        let text = s.create_text(root, &spec);
        assert_eq!(s.node_size(text), Size::new(50.0, 48.0));
    }

    #[test]
    fn test_draw_list_applies_perspective_and_hides() {
        let mut s = scene();
        let root = s.root();
        let near = s.create_rectangle(root, Color::WHITE);
        let far = s.create_rectangle(root, Color::WHITE);
        s.set_props(far, &NodeProps::new().depth(-9000.0));

        let items = s.draw_list();
        assert_eq!(items.len(), 2);
        // Deeper nodes paint first.
        assert_eq!(items[0].node, far);
        assert!(items[0].rect.width < items[1].rect.width);
        assert_eq!(items[1].rect.width, 100.0);

        s.set_visible(near, false);
        assert_eq!(s.draw_list().len(), 1);
    }

    #[test]
    fn test_playback_position_advances_only_while_playing() {
        let mut s = scene();
        let root = s.root();
        let video = s.create_video(root, Path::new("clip.ogv"), Size::new(400.0, 300.0));
        s.tick(Duration::from_millis(100));
        assert_eq!(s.node(video).unwrap().position, Duration::ZERO);
        assert!(!s.has_playing_media());

        s.set_playing(video, true);
        assert!(s.has_playing_media());
        s.tick(Duration::from_millis(100));
        assert_eq!(s.node(video).unwrap().position, Duration::from_millis(100));

        s.seek_to_start(video);
        assert_eq!(s.node(video).unwrap().position, Duration::ZERO);
    }
}
