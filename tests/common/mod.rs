#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docqa::config::Config;
use docqa::embedding::HashEmbedder;
use docqa::generation::ExtractiveGenerator;
use docqa::models::UploadFile;
use docqa::store::encode_data_url;
use docqa::DocumentQa;

/// Offline configuration rooted in `root`: hash embeddings, extractive answers.
pub fn offline_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.workspace.upload_dir = upload_dir(root);
    config.index.db_path = root.join("data").join("docqa.sqlite");
    config.embedding.provider = "hash".to_string();
    config.embedding.dims = Some(4096);
    config.generation.provider = "extractive".to_string();
    config
}

pub fn upload_dir(root: &Path) -> PathBuf {
    root.join("uploaded_files")
}

pub fn config_toml(root: &Path) -> String {
    format!(
        r#"[workspace]
upload_dir = "{root}/uploaded_files"

[index]
db_path = "{root}/data/docqa.sqlite"

[embedding]
provider = "hash"
dims = 4096

[generation]
provider = "extractive"
"#,
        root = root.display()
    )
}

pub async fn offline_service(root: &Path) -> DocumentQa {
    DocumentQa::with_providers(
        &offline_config(root),
        Arc::new(HashEmbedder::new(4096)),
        Arc::new(ExtractiveGenerator),
    )
    .await
    .unwrap()
}

pub fn text_upload(name: &str, text: &str) -> UploadFile {
    UploadFile::new(name, encode_data_url("text/plain", text.as_bytes()))
}

pub fn pdf_upload(name: &str, pages: &[&str]) -> UploadFile {
    UploadFile::new(name, encode_data_url("application/pdf", &render_pdf(pages)))
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal uncompressed PDF with one Helvetica text line per page.
pub fn render_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();

    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}
