//! Headless renderer that keeps node state in memory

use std::collections::BTreeMap;

use glam::Vec3;

use super::{FogParams, Model, NodeHandle, Pose, Renderer};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub model: Model,
    pub parent: Option<NodeHandle>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub pose: Pose,
    pub looped: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    nodes: BTreeMap<u32, NodeState>,
    next_id: u32,
    fog: Option<FogParams>,
    debug_lines: Vec<(Vec3, Vec3, [u8; 4])>,
}

impl RecordingRenderer {
    pub fn node(&self, node: NodeHandle) -> Option<&NodeState> {
        self.nodes.get(&node.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Last fog setting pushed by the simulation
    pub fn fog(&self) -> Option<FogParams> {
        self.fog
    }

    pub fn debug_lines(&self) -> &[(Vec3, Vec3, [u8; 4])] {
        &self.debug_lines
    }

    /// Drop debug lines from the previous frame
    pub fn begin_frame(&mut self) {
        self.debug_lines.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn create_node(&mut self, model: Model, parent: Option<NodeHandle>, position: Vec3) -> NodeHandle {
        self.next_id += 1;
        self.nodes.insert(
            self.next_id,
            NodeState {
                model,
                parent,
                position,
                rotation: Vec3::ZERO,
                scale: Vec3::ONE,
                pose: Pose::Stand,
                looped: true,
                visible: true,
            },
        );
        NodeHandle(self.next_id)
    }

    fn remove_node(&mut self, node: NodeHandle) {
        self.nodes.remove(&node.0);
        // Children go with their parent
        self.nodes.retain(|_, n| n.parent != Some(node));
    }

    fn node_position(&self, node: NodeHandle) -> Option<Vec3> {
        self.nodes.get(&node.0).map(|n| n.position)
    }

    fn set_position(&mut self, node: NodeHandle, position: Vec3) {
        if let Some(n) = self.nodes.get_mut(&node.0) {
            n.position = position;
        }
    }

    fn set_rotation(&mut self, node: NodeHandle, rotation: Vec3) {
        if let Some(n) = self.nodes.get_mut(&node.0) {
            n.rotation = rotation;
        }
    }

    fn set_scale(&mut self, node: NodeHandle, scale: Vec3) {
        if let Some(n) = self.nodes.get_mut(&node.0) {
            n.scale = scale;
        }
    }

    fn set_pose(&mut self, node: NodeHandle, pose: Pose, looped: bool) {
        if let Some(n) = self.nodes.get_mut(&node.0) {
            n.pose = pose;
            n.looped = looped;
        }
    }

    fn set_visible(&mut self, node: NodeHandle, visible: bool) {
        if let Some(n) = self.nodes.get_mut(&node.0) {
            n.visible = visible;
        }
    }

    fn set_fog(&mut self, fog: FogParams) {
        self.fog = Some(fog);
    }

    fn draw_debug_line(&mut self, from: Vec3, to: Vec3, color: [u8; 4]) {
        self.debug_lines.push((from, to, color));
    }
}
