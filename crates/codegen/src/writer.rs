//! Structured source writer
//!
//! Language-agnostic builders producing formatted Rust source. Output is
//! deterministic: items render in insertion order, indentation follows a
//! push/pop stack, and the finished [`Document`] writes to any sink.

use std::io;

const INDENT: &str = "    ";

/// An immutable finished document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        sink.write_all(self.0.as_bytes())
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Indent-tracking text writer.
#[derive(Debug, Default)]
pub struct SourceWriter {
    buf: String,
    indent: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.buf.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// A `///` doc comment, one line per input line.
    pub fn doc(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.line("///");
            } else {
                self.line(format!("/// {line}"));
            }
        }
    }

    pub fn comment(&mut self, text: &str) {
        for line in text.lines() {
            self.line(format!("// {line}"));
        }
    }

    /// Open a brace block: `prefix {` and push one indent level.
    pub fn open(&mut self, prefix: impl AsRef<str>) {
        self.line(format!("{} {{", prefix.as_ref()));
        self.indent += 1;
    }

    /// Close the current block with `}`.
    pub fn close(&mut self) {
        self.close_with("}");
    }

    /// Close the current block with custom text (e.g. `});`).
    pub fn close_with(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> Document {
        Document(self.buf)
    }
}

/// Builder for a struct item.
#[derive(Debug, Default)]
pub struct StructBuilder {
    name: String,
    doc: Option<String>,
    derives: Vec<String>,
    fields: Vec<(Option<String>, String, String)>,
}

impl StructBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        StructBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn derive(mut self, derive: &str) -> Self {
        self.derives.push(derive.to_string());
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.fields.push((None, name.into(), ty.into()));
        self
    }

    pub fn field_doc(
        mut self,
        doc: impl Into<String>,
        name: impl Into<String>,
        ty: impl Into<String>,
    ) -> Self {
        self.fields.push((Some(doc.into()), name.into(), ty.into()));
        self
    }

    pub fn write(self, w: &mut SourceWriter) {
        if let Some(doc) = &self.doc {
            w.doc(doc);
        }
        if !self.derives.is_empty() {
            w.line(format!("#[derive({})]", self.derives.join(", ")));
        }
        if self.fields.is_empty() {
            w.line(format!("pub struct {};", self.name));
            return;
        }
        w.open(format!("pub struct {}", self.name));
        for (doc, name, ty) in &self.fields {
            if let Some(doc) = doc {
                w.doc(doc);
            }
            w.line(format!("pub {name}: {ty},"));
        }
        w.close();
    }
}

/// Builder for an enum item (plain, payload-carrying, or int-backed).
#[derive(Debug, Default)]
pub struct EnumBuilder {
    name: String,
    doc: Option<String>,
    derives: Vec<String>,
    repr: Option<String>,
    variants: Vec<(Option<String>, String, Option<String>)>,
}

impl EnumBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        EnumBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn derive(mut self, derive: &str) -> Self {
        self.derives.push(derive.to_string());
        self
    }

    pub fn repr(mut self, repr: &str) -> Self {
        self.repr = Some(repr.to_string());
        self
    }

    pub fn variant(mut self, name: impl Into<String>) -> Self {
        self.variants.push((None, name.into(), None));
        self
    }

    pub fn variant_with(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.variants.push((None, name.into(), Some(payload.into())));
        self
    }

    pub fn variant_doc(mut self, doc: impl Into<String>, name: impl Into<String>) -> Self {
        self.variants.push((Some(doc.into()), name.into(), None));
        self
    }

    pub fn write(self, w: &mut SourceWriter) {
        if let Some(doc) = &self.doc {
            w.doc(doc);
        }
        if !self.derives.is_empty() {
            w.line(format!("#[derive({})]", self.derives.join(", ")));
        }
        if let Some(repr) = &self.repr {
            w.line(format!("#[repr({repr})]"));
        }
        w.open(format!("pub enum {}", self.name));
        for (doc, name, payload) in &self.variants {
            if let Some(doc) = doc {
                w.doc(doc);
            }
            match payload {
                Some(payload) => w.line(format!("{name}({payload}),")),
                None => w.line(format!("{name},")),
            }
        }
        w.close();
    }
}

/// Builder for a free function or method.
#[derive(Debug, Default)]
pub struct FnBuilder {
    signature: String,
    doc: Option<String>,
    attrs: Vec<String>,
}

impl FnBuilder {
    /// `signature` is everything between `fn ` and the body, e.g.
    /// `pub fn put_item(&self, input: PutItemInput) -> Result<Request, CodecError>`.
    pub fn new(signature: impl Into<String>) -> Self {
        FnBuilder {
            signature: signature.into(),
            ..Default::default()
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn attr(mut self, attr: &str) -> Self {
        self.attrs.push(attr.to_string());
        self
    }

    pub fn write(self, w: &mut SourceWriter, body: impl FnOnce(&mut SourceWriter)) {
        if let Some(doc) = &self.doc {
            w.doc(doc);
        }
        for attr in &self.attrs {
            w.line(format!("#[{attr}]"));
        }
        w.open(&self.signature);
        body(w);
        w.close();
    }
}

/// Quote a string for inclusion in generated source.
pub fn quoted(text: &str) -> String {
    format!("{text:?}")
}
