//! `META-INF/MANIFEST.MF` synthesis.

/// Archive path of the manifest; always the first entry written.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MANIFEST_VERSION: &str = "1.0";

/// Manifest lines may not exceed 72 bytes, excluding the line ending.
const MAX_LINE_BYTES: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub main_class: String,
    pub created_by: String,
}

impl Manifest {
    pub fn new(main_class: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            main_class: main_class.into(),
            created_by: created_by.into(),
        }
    }

    /// Render the main section, CRLF-terminated, wrapped at 72 bytes.
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        for (name, value) in [
            ("Manifest-Version", MANIFEST_VERSION),
            ("Created-By", self.created_by.as_str()),
            ("Main-Class", self.main_class.as_str()),
        ] {
            write_attribute(&mut out, name, value);
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    let line = format!("{name}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE_BYTES;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        // The leading space of a continuation line counts toward its length.
        limit = MAX_LINE_BYTES - 1;
    }
}
