//! Academic-term table probed by the catalog client.

/// One academic term recognized by the catalog API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermDescriptor {
    /// Opaque catalog identifier (the `srcdb` the API expects).
    pub code: &'static str,
    /// Human-readable term label.
    pub name: &'static str,
}

/// Terms in probe order, most recent first.
///
/// The ordering is the search priority: a code query is answered from the
/// newest term that knows the course.
pub const TERM_TABLE: &[TermDescriptor] = &[
    TermDescriptor { code: "1266", name: "Summer 2026" },
    TermDescriptor { code: "1264", name: "Spring 2026" },
    TermDescriptor { code: "1262", name: "January 2026" },
    TermDescriptor { code: "1258", name: "Fall 2025" },
    TermDescriptor { code: "1256", name: "Summer 2025" },
    TermDescriptor { code: "1254", name: "Spring 2025" },
    TermDescriptor { code: "1252", name: "January 2025" },
    TermDescriptor { code: "1248", name: "Fall 2024" },
    TermDescriptor { code: "1246", name: "Summer 2024" },
    TermDescriptor { code: "1244", name: "Spring 2024" },
];
