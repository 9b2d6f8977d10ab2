//! Fragment file parsing
//!
//! A fragment is an XML document with a `siteMap` root element holding one
//! top-level `siteMapNode`, which in turn nests further `siteMapNode`
//! elements. Element and attribute names are matched on their local name so
//! namespaced documents parse the same way.

use crate::error::FragmentError;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};

const SITE_MAP: &[u8] = b"siteMap";
const SITE_MAP_NODE: &[u8] = b"siteMapNode";

/// A `siteMapNode` as written in the fragment, before ids are assigned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNode {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub roles: Option<String>,
    pub children: Vec<RawNode>,
}

impl RawNode {
    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RawNode::count).sum::<usize>()
    }
}

/// One parsed fragment source
#[derive(Debug, Clone)]
pub struct Fragment {
    pub path: PathBuf,
    /// The first top-level `siteMapNode`
    pub root: RawNode,
    /// Further top-level `siteMapNode` siblings, which are not merged
    pub ignored_roots: usize,
}

enum Frame {
    SiteMap,
    Node(RawNode),
    Other,
}

impl Fragment {
    /// Read and parse a fragment file
    ///
    /// A zero-length file is `Empty`; anything else goes to the parser, so
    /// whitespace-only content is a parse failure.
    pub fn load(path: &Path) -> Result<Self, FragmentError> {
        let bytes = std::fs::read(path).map_err(|source| FragmentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if bytes.is_empty() {
            return Err(FragmentError::Empty {
                path: path.to_path_buf(),
            });
        }

        Self::parse(path, bytes)
    }

    /// Parse fragment content; `path` is only used for error reporting
    ///
    /// The encoding comes from the byte order mark or the XML declaration,
    /// UTF-8 when neither is present.
    pub fn parse(path: &Path, content: impl AsRef<[u8]>) -> Result<Self, FragmentError> {
        let xml_err = |source| FragmentError::Xml {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = Reader::from_reader(content.as_ref());
        let mut stack: Vec<Frame> = Vec::new();
        let mut roots: Vec<RawNode> = Vec::new();

        loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Start(e) => {
                    let frame = open_frame(&e, stack.last(), reader.decoder()).map_err(xml_err)?;
                    stack.push(frame);
                }
                Event::Empty(e) => {
                    let frame = open_frame(&e, stack.last(), reader.decoder()).map_err(xml_err)?;
                    close_frame(frame, &mut stack, &mut roots);
                }
                Event::End(_) => {
                    if let Some(frame) = stack.pop() {
                        close_frame(frame, &mut stack, &mut roots);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(FragmentError::Truncated {
                path: path.to_path_buf(),
            });
        }

        if roots.is_empty() {
            return Err(FragmentError::MissingRoot {
                path: path.to_path_buf(),
            });
        }

        let root = roots.remove(0);
        Ok(Self {
            path: path.to_path_buf(),
            root,
            ignored_roots: roots.len(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

fn open_frame(
    e: &BytesStart<'_>,
    parent: Option<&Frame>,
    decoder: Decoder,
) -> Result<Frame, quick_xml::Error> {
    let name = e.local_name();
    let frame = match parent {
        None if name.as_ref() == SITE_MAP => Frame::SiteMap,
        Some(Frame::SiteMap | Frame::Node(_)) if name.as_ref() == SITE_MAP_NODE => {
            Frame::Node(read_node(e, decoder)?)
        }
        _ => Frame::Other,
    };
    Ok(frame)
}

fn close_frame(frame: Frame, stack: &mut [Frame], roots: &mut Vec<RawNode>) {
    let Frame::Node(node) = frame else {
        return;
    };
    match stack.last_mut() {
        Some(Frame::Node(parent)) => parent.children.push(node),
        Some(Frame::SiteMap) => roots.push(node),
        _ => {}
    }
}

fn read_node(e: &BytesStart<'_>, decoder: Decoder) -> Result<RawNode, quick_xml::Error> {
    let mut node = RawNode::default();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        match attr.key.local_name().as_ref() {
            b"url" => node.url = Some(value),
            b"title" => node.title = Some(value),
            b"description" => node.description = Some(value),
            b"roles" => node.roles = Some(value),
            // `id` is always reassigned by the builder
            _ => {}
        }
    }
    Ok(node)
}
