use super::Error;
use super::image::Image;
use super::layer::Layer;
use super::parser::Instruction;

/// An instruction group opened by a FROM statement.
///
/// Stages are 0-indexed in the Dockerfile. A stage exclusively owns its
/// layers; mutation goes through the owning `Dockerfile`.
#[derive(Debug, Clone)]
pub struct Stage {
    index: usize,
    line: usize,
    name: String,
    baseimage: Image,
    // raw --platform etc, preserved when the header is rebuilt
    raw_flags: Vec<String>,
    original: String,
    layers: Vec<Layer>,
}

impl Stage {
    pub(crate) fn from_instruction(index: usize, inst: &Instruction) -> Result<Self, Error> {
        let image = inst.value.first().ok_or_else(|| {
            Error::Parse(format!(
                "FROM statement on line {} has no base image",
                inst.start_line
            ))
        })?;

        let name = match inst.value.get(1) {
            Some(keyword) if keyword.eq_ignore_ascii_case("as") => {
                inst.value.get(2).cloned().unwrap_or_default()
            }
            _ => String::new(),
        };

        Ok(Self {
            index,
            line: inst.start_line,
            name,
            baseimage: Image::new(image),
            raw_flags: inst.flags.clone(),
            original: inst.original.clone(),
            layers: Vec::new(),
        })
    }

    /// Position of this stage in the Dockerfile.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Line on which the stage is declared.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The stage name from `AS <name>`, or empty for an unnamed stage.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn baseimage(&self) -> &Image {
        &self.baseimage
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    /// The FROM statement declaring this stage.
    pub fn text(&self) -> &str {
        &self.original
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// Swap the base image and rebuild the stage header text.
    pub(crate) fn set_baseimage(&mut self, image: Image) {
        self.baseimage = image;
        let mut parts = vec!["FROM".to_string()];
        parts.extend(self.raw_flags.iter().cloned());
        parts.push(self.baseimage.full_name());
        if !self.name.is_empty() {
            parts.push("AS".to_string());
            parts.push(self.name.clone());
        }
        self.original = parts.join(" ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dockerfile::parser;

    fn stage_from(text: &str) -> Stage {
        let instructions = parser::parse(text).unwrap();
        Stage::from_instruction(0, &instructions[0]).unwrap()
    }

    #[test]
    fn test_from_statement() {
        let stage = stage_from("FROM node:20 AS build");
        assert_eq!(stage.name(), "build");
        assert_eq!(stage.baseimage().full_name(), "node:20");
        assert_eq!(stage.text(), "FROM node:20 AS build");

        let unnamed = stage_from("FROM node:20");
        assert_eq!(unnamed.name(), "");

        let lowercase = stage_from("FROM node:20 as build");
        assert_eq!(lowercase.name(), "build");
    }

    #[test]
    fn test_from_requires_image() {
        let instructions = parser::parse("FROM").unwrap();
        assert!(Stage::from_instruction(0, &instructions[0]).is_err());
    }

    #[test]
    fn test_set_baseimage_rebuilds_header() {
        let mut stage = stage_from("FROM node:20 AS final");
        stage.set_baseimage(Image::new("node:20-alpine"));
        assert_eq!(stage.text(), "FROM node:20-alpine AS final");

        let mut platform = stage_from("FROM --platform=linux/amd64 node:20");
        platform.set_baseimage(Image::new("node:alpine"));
        assert_eq!(platform.text(), "FROM --platform=linux/amd64 node:alpine");
    }
}
