// SPDX-License-Identifier: MIT

//! External collaborators of the workflow: text generation, user input,
//! artifact output and diagram rendering

pub mod artifacts;
pub mod diagram;
pub mod generator;
pub mod input;

use std::sync::Arc;

pub use artifacts::{ArtifactWriter, FsArtifactWriter, MemoryArtifactWriter};
pub use diagram::{describe, export_diagram, to_mermaid, DiagramRenderer, MermaidInkRenderer};
pub use generator::{Generator, ModelGenerator, PromptLibrary, PromptTemplate, Variables};
pub use input::{LineReader, ScriptedReader, StdinReader};

/// Services handed to task nodes when a workflow is built
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn Generator>,
    pub reader: Arc<dyn LineReader>,
    pub writer: Arc<dyn ArtifactWriter>,
}

impl Collaborators {
    pub fn new(
        generator: Arc<dyn Generator>,
        reader: Arc<dyn LineReader>,
        writer: Arc<dyn ArtifactWriter>,
    ) -> Self {
        Self {
            generator,
            reader,
            writer,
        }
    }
}
