// ABOUTME: SeaORM entities module for the media library and content collections
// ABOUTME: Exports entity definitions for media assets and content documents

pub mod content_document;
pub mod media;
