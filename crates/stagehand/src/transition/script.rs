use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::SlidePhase;
use crate::error::TransitionLoadError;
use crate::layout::Size;
use crate::renderer::{Animation, AnimationId, Easing, NodeId, NodeProps, Renderer};

const DEFAULT_DURATION_MS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionScript {
    #[serde(default)]
    pub background: Option<NodeProps>,
    pub midground: NodeProps,
    pub foreground: NodeProps,
    #[serde(default)]
    pub actor: NodeProps,
    pub state: StateDescription,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDescription {
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub states: ScriptStates,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MS
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStates {
    #[serde(default)]
    pub pre: StateTargets,
    #[serde(default)]
    pub show: StateTargets,
    #[serde(default)]
    pub action: StateTargets,
    #[serde(default)]
    pub post: StateTargets,
}

impl ScriptStates {
    pub fn get(&self, state: ScriptState) -> &StateTargets {
        match state {
            ScriptState::Pre => &self.pre,
            ScriptState::Show => &self.show,
            ScriptState::Action => &self.action,
            ScriptState::Post => &self.post,
        }
    }
}

/// Property targets of one state, keyed by container.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateTargets {
    pub actor: Option<NodeProps>,
    pub background: Option<NodeProps>,
    pub midground: Option<NodeProps>,
    pub foreground: Option<NodeProps>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Pre,
    Show,
    Action,
    Post,
}

impl ScriptState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Show => "show",
            Self::Action => "action",
            Self::Post => "post",
        }
    }

    /// Phase the slide settles in once this state finishes animating.
    pub fn on_complete(self) -> SlidePhase {
        match self {
            Self::Show | Self::Action => SlidePhase::Active,
            Self::Pre | Self::Post => SlidePhase::Resting,
        }
    }
}

/// Ordered directories searched for `<name>.json`.
#[derive(Debug, Clone)]
pub struct TransitionSearchPath {
    dirs: Vec<PathBuf>,
}

impl TransitionSearchPath {
    /// Current directory, `./transitions/`, `extra`, then the shared data
    /// directory.
    pub fn new(extra: Option<PathBuf>) -> Self {
        let mut search = vec![PathBuf::new(), PathBuf::from("./transitions/")];
        search.extend(extra);
        if let Some(data) = dirs::data_dir() {
            search.push(data.join("stagehand"));
        }
        Self { dirs: search }
    }

    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First existing `<dir>/<name>.json`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.json");
        self.dirs
            .iter()
            .map(|dir| dir.join(&file))
            .find(|path| path.is_file())
    }

    pub fn load(&self, name: &str) -> Result<TransitionScript, TransitionLoadError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| TransitionLoadError::NotFound {
                name: name.to_string(),
            })?;
        load_file(&path)
    }
}

pub fn load_file(path: &Path) -> Result<TransitionScript, TransitionLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| TransitionLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| TransitionLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// The live node tree of a loaded script, plus the state it is driving.
#[derive(Debug)]
pub struct TransitionRuntime {
    script: TransitionScript,
    pub actor: NodeId,
    pub background: Option<NodeId>,
    pub midground: NodeId,
    pub foreground: NodeId,
    /// Created the first time the slide has text to shade.
    pub shading: Option<NodeId>,
    /// Whether the slide's text currently lives in `foreground`.
    pub holds_text: bool,
    /// Whether the slide's background currently lives in `background`.
    pub holds_background: bool,
    state: ScriptState,
    pending: Vec<AnimationId>,
}

impl TransitionRuntime {
    /// Build the script's containers on the stage and warp to `pre`.
    pub fn install(renderer: &mut dyn Renderer, script: TransitionScript) -> Self {
        let root = renderer.root();
        let actor = renderer.create_container(root);
        let background = script.background.map(|props| {
            let node = renderer.create_container(actor);
            renderer.set_props(node, &props);
            node
        });
        let midground = renderer.create_container(actor);
        renderer.set_props(midground, &script.midground);
        let foreground = renderer.create_container(actor);
        renderer.set_props(foreground, &script.foreground);
        renderer.set_props(actor, &script.actor);
        renderer.set_visible(actor, false);

        let mut runtime = Self {
            script,
            actor,
            background,
            midground,
            foreground,
            shading: None,
            holds_text: false,
            holds_background: false,
            state: ScriptState::Pre,
            pending: Vec::new(),
        };
        runtime.warp(renderer, ScriptState::Pre);
        runtime
    }

    pub fn state(&self) -> ScriptState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    fn targets(&self, state: ScriptState) -> Vec<(NodeId, NodeProps)> {
        let t = self.script.state.states.get(state);
        [
            (Some(self.actor), t.actor),
            (self.background, t.background),
            (Some(self.midground), t.midground),
            (Some(self.foreground), t.foreground),
        ]
        .into_iter()
        .filter_map(|(node, props)| Some((node?, props?)))
        .filter(|(_, props)| !props.is_empty())
        .collect()
    }

    /// Jump straight to `state` without animating or reporting completion.
    pub fn warp(&mut self, renderer: &mut dyn Renderer, state: ScriptState) {
        for (node, props) in self.targets(state) {
            renderer.set_props(node, &props);
        }
        self.state = state;
        self.pending.clear();
    }

    /// Start animating towards `state`, replacing any pending state.
    /// Returns the state at once if there is nothing to animate.
    pub fn set_state(&mut self, renderer: &mut dyn Renderer, state: ScriptState) -> Option<ScriptState> {
        let description = &self.script.state;
        let (duration, easing) = (description.duration, description.easing);
        self.state = state;
        self.pending = self
            .targets(state)
            .into_iter()
            .map(|(node, props)| renderer.animate(node, &Animation::new(duration, easing, props)))
            .collect();
        self.pending.is_empty().then_some(state)
    }

    /// Record a finished animation. Returns the state when its last pending
    /// animation is done. Unknown ids are ignored.
    pub fn animation_finished(&mut self, id: AnimationId) -> Option<ScriptState> {
        let before = self.pending.len();
        self.pending.retain(|p| *p != id);
        (self.pending.len() < before && self.pending.is_empty()).then_some(self.state)
    }

    pub fn resize(&self, renderer: &mut dyn Renderer, stage: Size) {
        let size = NodeProps::new().size(stage);
        renderer.set_props(self.actor, &size);
        renderer.set_props(self.foreground, &size);
        if let Some(background) = self.background {
            renderer.set_props(background, &size);
        }
    }

    pub fn destroy(self, renderer: &mut dyn Renderer) {
        renderer.destroy(self.actor);
    }
}
