use serde::Serialize;

use crate::layout::{FlatText, LineMetric};
use crate::segment::Chunk;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Page {
    pub chunks: Vec<Chunk>,
}

impl Page {
    pub fn leading_sequence_index(&self) -> Option<usize> {
        self.chunks.first().map(|chunk| chunk.sequence_index)
    }

    pub fn contains(&self, sequence_index: usize) -> bool {
        self.chunks
            .iter()
            .any(|chunk| chunk.sequence_index == sequence_index)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Greedily packs chunks onto pages of at most `page_height`, driven by measured lines.
///
/// `flat` and `lines` must both describe the same `chunks`. A chunk goes to the page
/// on which its first line is encountered and is never split; the chunk whose line
/// overflows the page opens the next one. A page always holds at least one chunk, so
/// a chunk taller than the page ends up alone on its own page. Chunks that no line
/// touches stay in sequence with their neighbours.
pub fn paginate(
    chunks: &[Chunk],
    flat: &FlatText,
    lines: &[LineMetric],
    page_height: f32,
) -> Vec<Page> {
    if lines.is_empty() || chunks.is_empty() {
        return Vec::new();
    }

    let mut builder = PageBuilder::new(chunks, lines[0].vertical_position);

    for line in lines {
        let first = flat
            .spans
            .partition_point(|span| span.end <= line.start_offset);
        let overlapping = flat.spans[first..]
            .iter()
            .enumerate()
            .take_while(|(_, span)| span.start < line.end_offset)
            .map(|(pos, _)| first + pos);

        for index in overlapping {
            if index < builder.next_chunk {
                continue;
            }
            builder.place(index, line, page_height);
        }
    }

    builder.finish()
}

struct PageBuilder<'a> {
    chunks: &'a [Chunk],
    pages: Vec<Page>,
    current: Page,
    page_start_y: f32,
    next_chunk: usize,
}

impl<'a> PageBuilder<'a> {
    fn new(chunks: &'a [Chunk], first_line_y: f32) -> Self {
        Self {
            chunks,
            pages: Vec::new(),
            current: Page::default(),
            page_start_y: first_line_y,
            next_chunk: 0,
        }
    }

    fn place(&mut self, index: usize, line: &LineMetric, page_height: f32) {
        // Anything skipped over had no measured line of its own.
        while self.next_chunk < index {
            self.push_next();
        }

        let fits = (line.vertical_position - self.page_start_y) + line.height <= page_height;
        if !fits && !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
            self.page_start_y = line.vertical_position;
        }
        self.push_next();
    }

    fn push_next(&mut self) {
        self.current.chunks.push(self.chunks[self.next_chunk].clone());
        self.next_chunk += 1;
    }

    fn finish(mut self) -> Vec<Page> {
        while self.next_chunk < self.chunks.len() {
            self.push_next();
        }
        if !self.current.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}
