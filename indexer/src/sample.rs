use termrank_core::Document;

/// The fixed corpus `seed` and `demo` install.
pub fn documents() -> Vec<Document> {
    vec![
        Document::new(1, "After the medication, headache and nausea were reported by the patient."),
        Document::new(2, "The patient reported nausea and dizziness caused by the medication."),
        Document::new(3, "Headache and dizziness are common effects of this medication."),
        Document::new(4, "The medication caused a headache and nausea, but no dizziness was reported."),
    ]
}

pub const QUERIES: &[&str] = &[
    "nausea and dizziness",
    "effects",
    "nausea was reported",
    "dizziness",
    "the medication",
];
