// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod builtin;
mod definitions;
mod registry;
mod tool;

pub use builtin::{BashTool, ReadTool, WriteTool};
pub use definitions::{load_definitions, parse_definition, DefinitionError};
pub use registry::{RegistryError, ToolRegistry};
pub use tool::{parse_args, Tool, ToolErrorKind, ToolOutput};
