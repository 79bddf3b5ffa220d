//! Contract text extraction

use std::io::{Cursor, Read};

use regex::{Captures, Regex};
use tracing::debug;

use super::{DocumentError, extension};

const DOCUMENT_PART: &str = "word/document.xml";

/// Supported contract upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFormat {
    Docx,
    Txt,
}

impl ContractFormat {
    pub fn from_filename(filename: &str) -> Result<Self, DocumentError> {
        debug!(%filename, "ContractFormat::from_filename: called");
        match extension(filename).as_deref() {
            Some("docx") => Ok(Self::Docx),
            Some("txt") => Ok(Self::Txt),
            _ => Err(DocumentError::UnsupportedFormat {
                filename: filename.to_string(),
                expected: ".docx or .txt",
            }),
        }
    }
}

/// Read the plain text of an uploaded contract
///
/// DOCX paragraphs are joined with `\n`; text files are taken as UTF-8.
pub fn read_contract_text(filename: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    debug!(%filename, size = bytes.len(), "read_contract_text: called");
    match ContractFormat::from_filename(filename)? {
        ContractFormat::Docx => docx_text(bytes),
        ContractFormat::Txt => {
            let text = String::from_utf8(bytes.to_vec())?;
            Ok(text.trim_start_matches('\u{feff}').to_string())
        }
    }
}

fn docx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    debug!("docx_text: called");
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Err(DocumentError::MissingPart(DOCUMENT_PART)),
        Err(e) => return Err(e.into()),
    }

    let paragraph = Regex::new(r"(?s)<w:p(?:\s[^>]*[^/>])?>.*?</w:p>|<w:p(?:\s[^>]*)?/>")?;
    let run = Regex::new(r"(?s)<w:t(?:\s[^>]*[^/>])?>(?P<text>.*?)</w:t>|<w:(?P<tab>tab)/>|<w:(?:br|cr)(?:\s[^>]*)?/>")?;
    let entity = Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);")?;

    let paragraphs: Vec<String> = paragraph
        .find_iter(&xml)
        .map(|p| {
            run.captures_iter(p.as_str())
                .map(|caps| match (caps.name("text"), caps.name("tab")) {
                    (Some(text), _) => decode_entities(&entity, text.as_str()),
                    (None, Some(_)) => "\t".to_string(),
                    (None, None) => "\n".to_string(),
                })
                .collect()
        })
        .collect();

    debug!(paragraphs = paragraphs.len(), "docx_text: extracted");
    Ok(paragraphs.join("\n"))
}

fn decode_entities(entity: &Regex, text: &str) -> String {
    entity
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = match name.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name[1..].parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = FileOptions::default();
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
            zip.start_file(DOCUMENT_PART, options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn body(paragraphs: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            paragraphs
        )
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(ContractFormat::from_filename("MSA.DOCX").unwrap(), ContractFormat::Docx);
        assert_eq!(ContractFormat::from_filename("terms.txt").unwrap(), ContractFormat::Txt);
        assert!(matches!(
            ContractFormat::from_filename("terms.pdf"),
            Err(DocumentError::UnsupportedFormat { .. })
        ));
        assert!(ContractFormat::from_filename("no-extension").is_err());
    }

    #[test]
    fn test_docx_paragraphs_joined_with_newline() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>1. Travel</w:t></w:r></w:p>
               <w:p w:rsidR="00AB"><w:r><w:t xml:space="preserve">Trips must not </w:t></w:r><w:r><w:t>exceed $3,000.</w:t></w:r></w:p>
               <w:p w:rsidR="00CD"/>
               <w:p><w:r><w:t>Meals</w:t><w:tab/><w:t>$50</w:t></w:r></w:p>"#,
        );
        let text = read_contract_text("contract.docx", &build_docx(&xml)).unwrap();
        assert_eq!(text, "1. Travel\nTrips must not exceed $3,000.\n\nMeals\t$50");
    }

    #[test]
    fn test_docx_entities_decoded() {
        let xml = body(r#"<w:p><w:r><w:t>R&amp;D &lt;capped&gt; &quot;net&quot; &#8364;5 &#x41;</w:t></w:r></w:p>"#);
        let text = read_contract_text("c.docx", &build_docx(&xml)).unwrap();
        assert_eq!(text, "R&D <capped> \"net\" €5 A");
    }

    #[test]
    fn test_docx_without_document_part() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("other.xml", FileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = read_contract_text("c.docx", &buf.into_inner()).unwrap_err();
        assert!(matches!(err, DocumentError::MissingPart(_)));
    }

    #[test]
    fn test_garbage_docx_rejected() {
        let err = read_contract_text("c.docx", b"not a zip file").unwrap_err();
        assert!(matches!(err, DocumentError::Archive(_)));
    }

    #[test]
    fn test_txt_contract() {
        let text = read_contract_text("c.txt", "\u{feff}Section 1\nPay on time.".as_bytes()).unwrap();
        assert_eq!(text, "Section 1\nPay on time.");

        let err = read_contract_text("c.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, DocumentError::Encoding(_)));
    }
}
