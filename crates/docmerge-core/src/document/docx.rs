use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::io::{Cursor, Read, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{
    BlockAnchor, DocumentTree, Run, RunAnchor, RunStyle, Section, Story, Table, TableCell,
    TableRow, TextBlock,
};
use crate::error::DocmergeError;

const PACKAGE_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_TYPE: &str = "/officeDocument";

/// A Word (.docx) package opened for text substitution.
///
/// The main document part and every header/footer part referenced from a
/// section are parsed into a [`DocumentTree`]. All other zip entries are
/// carried through untouched.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
    parts: Vec<XmlPart>,
    tree: DocumentTree,
}

impl DocxPackage {
    pub fn open(bytes: &[u8]) -> Result<Self, DocmergeError> {
        let entries = read_entries(bytes)?;
        let main = main_part_name(&entries)?;
        let main_xml = find_entry(&entries, &main).ok_or_else(|| {
            DocmergeError::Template(format!("missing main document part '{main}'"))
        })?;

        let mut parts = vec![XmlPart::parse(&main, main_xml)?];
        let body = parts[0].story(0, b"body")?;
        let references = parts[0].section_references();

        let relationships = read_relationships(&entries, &main)?;
        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(references.len());
        for refs in references {
            let mut section = Section::default();
            for reference in refs {
                let Some(target) = relationships.get(&reference.id) else {
                    tracing::warn!(id = %reference.id, "section references unknown relationship");
                    continue;
                };
                if !seen.insert(target.clone()) {
                    continue;
                }
                let Some(xml) = find_entry(&entries, target) else {
                    tracing::warn!(part = %target, "header/footer part missing from package");
                    continue;
                };
                let index = parts.len();
                parts.push(XmlPart::parse(target, xml)?);
                match reference.kind {
                    StoryKind::Header => section.headers.push(parts[index].story(index, b"hdr")?),
                    StoryKind::Footer => section.footers.push(parts[index].story(index, b"ftr")?),
                }
            }
            sections.push(section);
        }

        tracing::debug!(
            main = %main,
            parts = parts.len(),
            sections = sections.len(),
            "opened docx package"
        );

        Ok(Self {
            entries,
            parts,
            tree: DocumentTree { body, sections },
        })
    }

    pub fn document(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn document_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    /// Serialize the package, rewriting only the blocks that changed.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocmergeError> {
        let mut rewritten: Vec<Vec<&TextBlock>> = vec![Vec::new(); self.parts.len()];
        for block in self.tree.blocks() {
            if let (true, Some(anchor)) = (block.is_rewritten(), block.anchor) {
                rewritten[anchor.part].push(block);
            }
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            match self.parts.iter().position(|p| p.name == *name) {
                Some(i) if !rewritten[i].is_empty() => {
                    zip.write_all(&self.parts[i].render(&rewritten[i])?)?
                }
                _ => zip.write_all(data)?,
            }
        }
        Ok(zip.finish()?.into_inner())
    }
}

fn read_entries(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, DocmergeError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    Ok(entries)
}

fn find_entry<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, data)| data.as_slice())
}

fn xml_error(part: &str, err: impl Display) -> DocmergeError {
    DocmergeError::Xml {
        part: part.to_string(),
        reason: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

fn parse_relationships(part: &str, xml: &[u8]) -> Result<Vec<Relationship>, DocmergeError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(|e| xml_error(part, e))? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().into_inner()) == b"Relationship" => {
                let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) else {
                    continue;
                };
                out.push(Relationship {
                    id,
                    rel_type: attribute(&e, b"Type").unwrap_or_default(),
                    target,
                    external: attribute(&e, b"TargetMode").as_deref() == Some("External"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn main_part_name(entries: &[(String, Vec<u8>)]) -> Result<String, DocmergeError> {
    let Some(xml) = find_entry(entries, PACKAGE_RELS) else {
        return Ok(DEFAULT_MAIN_PART.to_string());
    };
    let main = parse_relationships(PACKAGE_RELS, xml)?
        .into_iter()
        .find(|rel| rel.rel_type.ends_with(OFFICE_DOCUMENT_TYPE) && !rel.external)
        .map(|rel| resolve_target("", &rel.target))
        .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
    Ok(main)
}

/// Relationship id to resolved part name, for the rels of `part`.
fn read_relationships(
    entries: &[(String, Vec<u8>)],
    part: &str,
) -> Result<HashMap<String, String>, DocmergeError> {
    let (dir, file) = match part.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", part),
    };
    let rels_name = if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    };
    let Some(xml) = find_entry(entries, &rels_name) else {
        return Ok(HashMap::new());
    };
    Ok(parse_relationships(&rels_name, xml)?
        .into_iter()
        .filter(|rel| !rel.external)
        .map(|rel| (rel.id, resolve_target(dir, &rel.target)))
        .collect())
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

// ---------------------------------------------------------------------------
// XML parts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum StoryKind {
    Header,
    Footer,
}

struct StoryReference {
    kind: StoryKind,
    id: String,
}

/// One parsed XML part, kept as an event list.
///
/// Every `w:t` element is normalized to exactly one text event between its
/// start and end events, holding the unescaped content re-escaped once.
#[derive(Debug, Clone)]
struct XmlPart {
    name: String,
    events: Vec<Event<'static>>,
    /// For each start event, the index of its matching end event.
    /// Every other event maps to itself.
    ends: Vec<usize>,
}

impl XmlPart {
    fn parse(name: &str, xml: &[u8]) -> Result<Self, DocmergeError> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut events = Vec::new();
        let mut open_text: Option<String> = None;

        loop {
            buf.clear();
            let event = reader.read_event_into(&mut buf).map_err(|e| xml_error(name, e))?;
            match event {
                Event::Eof => break,
                Event::Start(e) if is_w(e.name().into_inner(), b"t") => {
                    events.push(Event::Start(e.into_owned()));
                    open_text = Some(String::new());
                }
                Event::Empty(e) if is_w(e.name().into_inner(), b"t") => {
                    let end = e.to_end().into_owned();
                    events.push(Event::Start(e.into_owned()));
                    events.push(Event::Text(BytesText::new("")));
                    events.push(Event::End(end));
                }
                Event::Text(e) if open_text.is_some() => {
                    let text = e.unescape().map_err(|err| xml_error(name, err))?;
                    if let Some(acc) = open_text.as_mut() {
                        acc.push_str(&text);
                    }
                }
                Event::CData(e) if open_text.is_some() => {
                    if let Some(acc) = open_text.as_mut() {
                        acc.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(e) if is_w(e.name().into_inner(), b"t") => {
                    if let Some(text) = open_text.take() {
                        events.push(Event::Text(BytesText::new(&text).into_owned()));
                    }
                    events.push(Event::End(e.into_owned()));
                }
                other => events.push(other.into_owned()),
            }
        }

        let ends = match_ends(&events);
        Ok(Self {
            name: name.to_string(),
            events,
            ends,
        })
    }

    fn name_at(&self, i: usize) -> Option<&[u8]> {
        match &self.events[i] {
            Event::Start(e) | Event::Empty(e) => Some(e.name().into_inner()),
            Event::End(e) => Some(e.name().into_inner()),
            _ => None,
        }
    }

    fn is(&self, i: usize, local: &[u8]) -> bool {
        self.name_at(i).is_some_and(|name| is_w(name, local))
    }

    /// Indices of the direct child elements of the element starting at `parent`.
    fn children(&self, parent: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut i = parent + 1;
        while i < self.ends[parent] {
            match &self.events[i] {
                Event::Start(_) | Event::Empty(_) => {
                    out.push(i);
                    i = self.ends[i] + 1;
                }
                _ => i += 1,
            }
        }
        out
    }

    fn story(&self, part: usize, container: &[u8]) -> Result<Story, DocmergeError> {
        let root = (0..self.events.len())
            .find(|&i| matches!(self.events[i], Event::Start(_)) && self.is(i, container));
        let Some(root) = root else {
            return Ok(Story::default());
        };
        let (paragraphs, tables) = self.flow(part, root)?;
        Ok(Story { paragraphs, tables })
    }

    /// Direct paragraphs and tables of a body, header, footer or cell.
    fn flow(
        &self,
        part: usize,
        parent: usize,
    ) -> Result<(Vec<TextBlock>, Vec<Table>), DocmergeError> {
        let mut paragraphs = Vec::new();
        let mut tables = Vec::new();
        for child in self.children(parent) {
            if self.is(child, b"p") {
                paragraphs.push(self.paragraph(part, child)?);
            } else if self.is(child, b"tbl") {
                tables.push(self.table(part, child)?);
            }
        }
        Ok((paragraphs, tables))
    }

    fn table(&self, part: usize, tbl: usize) -> Result<Table, DocmergeError> {
        let mut rows = Vec::new();
        for tr in self.children(tbl).into_iter().filter(|&c| self.is(c, b"tr")) {
            let mut cells = Vec::new();
            for tc in self.children(tr).into_iter().filter(|&c| self.is(c, b"tc")) {
                let (paragraphs, tables) = self.flow(part, tc)?;
                cells.push(TableCell { paragraphs, tables });
            }
            rows.push(TableRow { cells });
        }
        Ok(Table { rows })
    }

    fn paragraph(&self, part: usize, p: usize) -> Result<TextBlock, DocmergeError> {
        let runs = self
            .children(p)
            .into_iter()
            .filter(|&c| self.is(c, b"r"))
            .map(|r| self.run(r))
            .collect::<Result<Vec<_>, _>>()?;
        let mut block = TextBlock::new(runs);
        block.anchor = Some(BlockAnchor {
            part,
            end: self.ends[p],
        });
        Ok(block)
    }

    fn run(&self, r: usize) -> Result<Run, DocmergeError> {
        let mut style = RunStyle::default();
        let mut text = String::new();
        for child in self.children(r) {
            let Some(name) = self.name_at(child) else {
                continue;
            };
            match local_name(name) {
                b"rPr" => style.raw = Some(self.serialize(child, self.ends[child])?),
                b"t" => text.push_str(&self.text_in(child)),
                b"tab" => text.push('\t'),
                b"br" | b"cr" if self.is_text_child(child) => text.push('\n'),
                _ => {}
            }
        }
        Ok(Run {
            style,
            text,
            anchor: Some(RunAnchor {
                start: r,
                end: self.ends[r],
            }),
        })
    }

    /// Run children that carry text: `w:t`, `w:tab`, `w:cr` and line
    /// breaks. Page and column breaks are structure.
    fn is_text_child(&self, c: usize) -> bool {
        let Some(name) = self.name_at(c) else {
            return false;
        };
        match local_name(name) {
            b"t" | b"tab" | b"cr" => true,
            b"br" => match &self.events[c] {
                Event::Start(e) | Event::Empty(e) => {
                    matches!(attribute(e, b"w:type").as_deref(), None | Some("textWrapping"))
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn text_in(&self, t: usize) -> String {
        match self.events.get(t + 1) {
            Some(Event::Text(e)) => match e.unescape() {
                Ok(text) => text.into_owned(),
                Err(_) => String::from_utf8_lossy(e).into_owned(),
            },
            _ => String::new(),
        }
    }

    /// Header/footer references of every section, in document order.
    fn section_references(&self) -> Vec<Vec<StoryReference>> {
        let mut sections = Vec::new();
        let mut i = 0;
        while i < self.events.len() {
            if self.is(i, b"sectPrChange") {
                i = self.ends[i] + 1;
                continue;
            }
            if self.is(i, b"sectPr") && !matches!(self.events[i], Event::End(_)) {
                let refs = self
                    .children(i)
                    .into_iter()
                    .filter_map(|c| {
                        let kind = if self.is(c, b"headerReference") {
                            StoryKind::Header
                        } else if self.is(c, b"footerReference") {
                            StoryKind::Footer
                        } else {
                            return None;
                        };
                        let id = match &self.events[c] {
                            Event::Start(e) | Event::Empty(e) => attribute(e, b"r:id")?,
                            _ => return None,
                        };
                        Some(StoryReference { kind, id })
                    })
                    .collect();
                sections.push(refs);
                i = self.ends[i] + 1;
                continue;
            }
            i += 1;
        }
        sections
    }

    fn serialize(&self, start: usize, end: usize) -> Result<String, DocmergeError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events[start..=end] {
            self.emit(&mut writer, event.clone())?;
        }
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn emit(&self, writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DocmergeError> {
        writer
            .write_event(event)
            .map_err(|e| xml_error(&self.name, e))
    }

    fn emit_range(
        &self,
        writer: &mut Writer<Vec<u8>>,
        start: usize,
        end: usize,
    ) -> Result<(), DocmergeError> {
        for event in &self.events[start..=end] {
            self.emit(writer, event.clone())?;
        }
        Ok(())
    }

    /// Write the part back out with the runs of `blocks` regenerated.
    fn render(&self, blocks: &[&TextBlock]) -> Result<Vec<u8>, DocmergeError> {
        let mut edited: HashMap<usize, &Run> = HashMap::new();
        let mut appended: HashMap<usize, Vec<&Run>> = HashMap::new();
        for block in blocks {
            let Some(anchor) = block.anchor else {
                continue;
            };
            for run in block.runs() {
                match run.anchor {
                    Some(ra) => {
                        edited.insert(ra.start, run);
                    }
                    None => appended.entry(anchor.end).or_default().push(run),
                }
            }
        }

        let mut writer = Writer::new(Vec::new());
        let mut i = 0;
        while i < self.events.len() {
            if let Some(run) = edited.get(&i) {
                self.write_run(&mut writer, i, run)?;
                i = self.ends[i] + 1;
                continue;
            }
            if let Some(runs) = appended.get(&i) {
                let prefix = prefix_of(self.name_at(i).unwrap_or_default());
                match &self.events[i] {
                    Event::Empty(p) => {
                        self.emit(&mut writer, Event::Start(p.clone()))?;
                        self.write_new_runs(&mut writer, &prefix, runs)?;
                        self.emit(&mut writer, Event::End(p.to_end()))?;
                    }
                    event => {
                        self.write_new_runs(&mut writer, &prefix, runs)?;
                        self.emit(&mut writer, event.clone())?;
                    }
                }
                i += 1;
                continue;
            }
            self.emit(&mut writer, self.events[i].clone())?;
            i += 1;
        }
        Ok(writer.into_inner())
    }

    /// Rewrite one run: text-bearing children are replaced by `run.text`
    /// at the position of the first of them, everything else is kept.
    fn write_run(
        &self,
        writer: &mut Writer<Vec<u8>>,
        start: usize,
        run: &Run,
    ) -> Result<(), DocmergeError> {
        let prefix = prefix_of(self.name_at(start).unwrap_or_default());
        if let Event::Empty(r) = &self.events[start] {
            self.emit(writer, Event::Start(r.clone()))?;
            self.write_text(writer, &prefix, &run.text)?;
            return self.emit(writer, Event::End(r.to_end()));
        }

        let children = self.children(start);
        let is_text = |c: usize| self.is_text_child(c);
        let insert_at = children
            .iter()
            .position(|&c| is_text(c))
            .or_else(|| children.iter().position(|&c| self.is(c, b"rPr")).map(|p| p + 1))
            .unwrap_or(0);

        self.emit(writer, self.events[start].clone())?;
        for (k, &child) in children.iter().enumerate() {
            if k == insert_at {
                self.write_text(writer, &prefix, &run.text)?;
            }
            if !is_text(child) {
                self.emit_range(writer, child, self.ends[child])?;
            }
        }
        if insert_at >= children.len() {
            self.write_text(writer, &prefix, &run.text)?;
        }
        self.emit(writer, self.events[self.ends[start]].clone())
    }

    fn write_new_runs(
        &self,
        writer: &mut Writer<Vec<u8>>,
        prefix: &str,
        runs: &[&Run],
    ) -> Result<(), DocmergeError> {
        let r = format!("{prefix}r");
        for run in runs {
            self.emit(writer, Event::Start(BytesStart::new(r.as_str())))?;
            self.write_text(writer, prefix, &run.text)?;
            self.emit(writer, Event::End(BytesEnd::new(r.as_str())))?;
        }
        Ok(())
    }

    /// Emit `text` as `w:t` elements, with tabs and line breaks as
    /// `w:tab` and `w:br`. Characters XML 1.0 cannot carry are dropped.
    fn write_text(
        &self,
        writer: &mut Writer<Vec<u8>>,
        prefix: &str,
        text: &str,
    ) -> Result<(), DocmergeError> {
        let t = format!("{prefix}t");
        let mut pending = String::new();
        let flush = |writer: &mut Writer<Vec<u8>>,
                     pending: &mut String|
         -> Result<(), DocmergeError> {
            if pending.is_empty() {
                return Ok(());
            }
            let start = BytesStart::new(t.as_str()).with_attributes([("xml:space", "preserve")]);
            self.emit(writer, Event::Start(start))?;
            self.emit(writer, Event::Text(BytesText::new(pending.as_str())))?;
            self.emit(writer, Event::End(BytesEnd::new(t.as_str())))?;
            pending.clear();
            Ok(())
        };
        for ch in text.chars().filter(|&c| is_xml_char(c)) {
            let marker = match ch {
                '\t' => "tab",
                '\n' => "br",
                _ => {
                    pending.push(ch);
                    continue;
                }
            };
            flush(writer, &mut pending)?;
            let name = format!("{prefix}{marker}");
            self.emit(writer, Event::Empty(BytesStart::new(name.as_str())))?;
        }
        flush(writer, &mut pending)
    }
}

/// Characters allowed in XML 1.0 documents.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn match_ends(events: &[Event<'static>]) -> Vec<usize> {
    let mut ends: Vec<usize> = (0..events.len()).collect();
    let mut stack = Vec::new();
    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Start(_) => stack.push(i),
            Event::End(_) => {
                if let Some(open) = stack.pop() {
                    ends[open] = i;
                }
            }
            _ => {}
        }
    }
    ends
}

fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().position(|&b| b == b':') {
        Some(p) => &qname[p + 1..],
        None => qname,
    }
}

/// True for `w:{local}` or an unprefixed `{local}`.
fn is_w(qname: &[u8], local: &[u8]) -> bool {
    qname.strip_prefix(b"w:").unwrap_or(qname) == local
}

fn prefix_of(qname: &[u8]) -> String {
    match qname.iter().position(|&b| b == b':') {
        Some(p) => String::from_utf8_lossy(&qname[..=p]).into_owned(),
        None => String::new(),
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}
