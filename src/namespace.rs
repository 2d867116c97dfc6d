//! Class-name namespacing for markup injected into a host page.
//!
//! The panel renders inside somebody else's document, so every CSS class it
//! ships is prefixed (`btn` becomes `eruda-btn`) to keep the host's
//! stylesheets from matching it. [`ClassNamespacer::namespace`] accepts either
//! an HTML fragment, in which case only `class` attributes are rewritten, or
//! a bare class list / selector such as `".show-detail"`.
//!
//! Fragments are read leniently (void elements, valueless and unquoted
//! attributes, doctypes) and written back in one normalized form:
//!
//! ```text
//! <input class=a disabled>  ──►  <input class="ns-a" disabled>
//! ```
//!
//! Reading that normalized form yields the same tree again, which is what
//! makes namespacing idempotent.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use thiserror::Error;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static LEADING_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_-]+").unwrap());
static PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
static TAG_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9:._-]*$").unwrap());
static ATTRIBUTE_NAME: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[A-Za-z_:@][A-Za-z0-9_:.@-]*$").unwrap());

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
	"source", "track", "wbr",
];

/// Rewrites class tokens so they carry a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNamespacer {
	prefix: String,
}

impl ClassNamespacer {
	/// `prefix` should be made of class-name characters (see
	/// [`ClassNamespacer::is_valid_prefix`]).
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Whether `prefix` is a non-empty run of `[A-Za-z0-9_-]`.
	pub fn is_valid_prefix(prefix: &str) -> bool {
		PREFIX.is_match(prefix)
	}

	/// Namespaces an HTML fragment or a plain class list.
	///
	/// Markup that fails to parse is treated as a plain class list, which is
	/// lossy but never panics. Applying this twice gives the same result as
	/// applying it once.
	///
	/// # Examples
	/// ```
	/// use idb_inspector::ClassNamespacer;
	///
	/// let ns = ClassNamespacer::new("ns-");
	/// assert_eq!(
	///     ns.namespace(r#"<div class="foo bar"></div>"#),
	///     r#"<div class="ns-foo ns-bar"></div>"#
	/// );
	/// assert_eq!(ns.namespace(".show-detail"), ".ns-show-detail");
	/// ```
	pub fn namespace(&self, input: &str) -> String {
		if !MARKUP_TAG.is_match(input) {
			return self.rewrite_classes(input);
		}

		match self.rewrite_markup(input) {
			Ok(out) => out,
			Err(e) => {
				tracing::debug!(error = %e, "markup did not parse, namespacing as plain text");
				// Prefixing tag names can balance a fragment, so the plain text
				// result gets one more chance as markup.
				let plain = self.rewrite_classes(input);
				self.rewrite_markup(&plain).unwrap_or(plain)
			}
		}
	}

	/// Applies the token rule to a whitespace separated class list.
	pub fn rewrite_classes(&self, classes: &str) -> String {
		classes
			.split_whitespace()
			.map(|token| self.rewrite_token(token))
			.collect::<Vec<_>>()
			.join(" ")
	}

	fn rewrite_token(&self, token: &str) -> String {
		if token.contains(self.prefix.as_str()) {
			return token.to_string();
		}

		LEADING_WORD
			.replace(token, |caps: &Captures| format!("{}{}", self.prefix, &caps[0]))
			.into_owned()
	}

	fn rewrite_markup(&self, markup: &str) -> Result<String, MarkupError> {
		let mut tree = parse_markup(markup)?;
		self.rewrite_tree(&mut tree);
		Ok(render_markup(&tree))
	}

	fn rewrite_tree(&self, nodes: &mut [Node]) {
		for node in nodes {
			if let Node::Element(element) = node {
				for (name, value) in element.attributes.iter_mut() {
					if name.eq_ignore_ascii_case("class") {
						*value = self.rewrite_classes(value);
					}
				}
				self.rewrite_tree(&mut element.children);
			}
		}
	}
}

#[derive(Debug, Error)]
enum MarkupError {
	#[error(transparent)]
	Xml(#[from] quick_xml::Error),
	#[error(transparent)]
	Attribute(#[from] quick_xml::events::attributes::AttrError),
	#[error("invalid element name `{0}`")]
	ElementName(String),
	#[error("invalid attribute name `{0}`")]
	AttributeName(String),
	#[error("attribute `{0}` mixes both quote characters")]
	AttributeValue(String),
	#[error("unbalanced element `{0}`")]
	Unbalanced(String),
	#[error("unsupported markup construct")]
	Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
	Element(Element),
	/// Raw (still escaped) character data
	Text(String),
	CData(String),
	Comment(String),
	Doctype(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
	/// `<p>...</p>`
	Pair,
	/// `<p/>`
	SelfClosing,
	/// `<br>`
	Void,
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
	tag: String,
	/// Values are kept raw; an empty value renders as a bare name
	attributes: Vec<(String, String)>,
	children: Vec<Node>,
	closing: Closing,
}

impl Element {
	fn from_start(start: &BytesStart<'_>, closing: Closing) -> Result<Self, MarkupError> {
		let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
		if !TAG_NAME.is_match(&tag) {
			return Err(MarkupError::ElementName(tag));
		}

		let mut attributes = Vec::new();
		for attribute in start.html_attributes() {
			let attribute = attribute?;
			let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
			if !ATTRIBUTE_NAME.is_match(&name) {
				return Err(MarkupError::AttributeName(name));
			}
			let value = String::from_utf8_lossy(&attribute.value).into_owned();
			if value.contains('"') && value.contains('\'') {
				return Err(MarkupError::AttributeValue(name));
			}
			attributes.push((name, value));
		}

		Ok(Self {
			tag,
			attributes,
			children: Vec::new(),
			closing,
		})
	}

	fn is_void(tag: &str) -> bool {
		VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
	}
}

fn attach(open: &mut [Element], roots: &mut Vec<Node>, node: Node) {
	match open.last_mut() {
		Some(parent) => parent.children.push(node),
		None => roots.push(node),
	}
}

fn parse_markup(markup: &str) -> Result<Vec<Node>, MarkupError> {
	let mut reader = Reader::from_str(markup);
	let config = reader.config_mut();
	config.trim_text(false);
	// Void elements never close, so end tags are matched against our own stack
	config.check_end_names = false;

	let mut roots = Vec::new();
	let mut open: Vec<Element> = Vec::new();

	loop {
		match reader.read_event()? {
			Event::Start(start) => {
				let tag = start.name();
				if Element::is_void(&String::from_utf8_lossy(tag.as_ref())) {
					let element = Element::from_start(&start, Closing::Void)?;
					attach(&mut open, &mut roots, Node::Element(element));
				} else {
					open.push(Element::from_start(&start, Closing::Pair)?);
				}
			}
			Event::End(end) => {
				let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
				match open.pop() {
					Some(element) if element.tag == name => {
						attach(&mut open, &mut roots, Node::Element(element));
					}
					_ => return Err(MarkupError::Unbalanced(name)),
				}
			}
			Event::Empty(start) => {
				let element = Element::from_start(&start, Closing::SelfClosing)?;
				attach(&mut open, &mut roots, Node::Element(element));
			}
			Event::Text(text) => {
				let text = String::from_utf8_lossy(&text).into_owned();
				attach(&mut open, &mut roots, Node::Text(text));
			}
			Event::CData(data) => {
				let data = String::from_utf8_lossy(&data).into_owned();
				attach(&mut open, &mut roots, Node::CData(data));
			}
			Event::Comment(comment) => {
				let comment = String::from_utf8_lossy(&comment).into_owned();
				attach(&mut open, &mut roots, Node::Comment(comment));
			}
			Event::DocType(doctype) => {
				let doctype = String::from_utf8_lossy(&doctype).into_owned();
				attach(&mut open, &mut roots, Node::Doctype(doctype));
			}
			Event::Eof => break,
			_ => return Err(MarkupError::Unsupported),
		}
	}

	if let Some(element) = open.pop() {
		return Err(MarkupError::Unbalanced(element.tag));
	}

	Ok(roots)
}

fn render_markup(nodes: &[Node]) -> String {
	let mut out = String::new();
	render_into(nodes, &mut out);
	out
}

fn render_into(nodes: &[Node], out: &mut String) {
	for node in nodes {
		match node {
			Node::Element(element) => {
				out.push('<');
				out.push_str(&element.tag);
				for (name, value) in &element.attributes {
					out.push(' ');
					out.push_str(name);
					if value.is_empty() {
						continue;
					}
					let quote = if value.contains('"') { '\'' } else { '"' };
					out.push('=');
					out.push(quote);
					out.push_str(value);
					out.push(quote);
				}
				match element.closing {
					Closing::SelfClosing => out.push_str("/>"),
					Closing::Void => out.push('>'),
					Closing::Pair => {
						out.push('>');
						render_into(&element.children, out);
						out.push_str("</");
						out.push_str(&element.tag);
						out.push('>');
					}
				}
			}
			Node::Text(text) => out.push_str(text),
			Node::CData(data) => {
				out.push_str("<![CDATA[");
				out.push_str(data);
				out.push_str("]]>");
			}
			Node::Comment(comment) => {
				out.push_str("<!--");
				out.push_str(comment);
				out.push_str("-->");
			}
			Node::Doctype(doctype) => {
				out.push_str("<!DOCTYPE ");
				out.push_str(doctype);
				out.push('>');
			}
		}
	}
}
