//! Tantivy index over knowledge base translations
//!
//! Searching only needs an [`IndexReader`]. The [`IndexWriter`], and with it
//! tantivy's exclusive directory lock, is created on the first write.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermQuery, TermSetQuery};
use tantivy::schema::*;
use tantivy::snippet::SnippetGenerator;
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError};
use thiserror::Error;

use super::{FullTextEngine, IndexDocument, RawHit, RawId, SearchOptions};
use crate::config::EngineConfig;
use crate::content::{ContentType, SortDirection};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Cannot sort by '{0}'")]
    UnsortableField(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Tantivy error: {0}")]
    TantivyError(#[from] TantivyError),
}

#[derive(Debug, Clone, Copy)]
struct IndexFields {
    key: Field,
    id: Field,
    type_tag: Field,
    kb_locale_id: Field,
    scope_id: Field,
    title: Field,
    body: Field,
    tags: Field,
    attachment: Field,
    created_at: Field,
    updated_at: Field,
}

impl IndexFields {
    fn build_schema() -> (Schema, Self) {
        let mut builder = Schema::builder();

        let fields = Self {
            key: builder.add_text_field("key", STRING | STORED),
            id: builder.add_i64_field("id", INDEXED | STORED),
            type_tag: builder.add_text_field("type", STRING | STORED),
            kb_locale_id: builder.add_i64_field("kb_locale_id", INDEXED | STORED),
            scope_id: builder.add_i64_field("scope_id", INDEXED | STORED),
            title: builder.add_text_field("title", TEXT | STORED),
            body: builder.add_text_field("body", TEXT | STORED),
            tags: builder.add_text_field("tags", TEXT | STORED),
            attachment: builder.add_text_field("attachment", TEXT | STORED),
            created_at: builder.add_i64_field("created_at", STORED),
            updated_at: builder.add_i64_field("updated_at", STORED),
        };

        (builder.build(), fields)
    }

    fn from_schema(schema: &Schema) -> Result<Self, IndexError> {
        let field = |name: &str| {
            schema.get_field(name).map_err(|_| {
                IndexError::InitializationError(format!("Missing '{}' field in schema", name))
            })
        };

        Ok(Self {
            key: field("key")?,
            id: field("id")?,
            type_tag: field("type")?,
            kb_locale_id: field("kb_locale_id")?,
            scope_id: field("scope_id")?,
            title: field("title")?,
            body: field("body")?,
            tags: field("tags")?,
            attachment: field("attachment")?,
            created_at: field("created_at")?,
            updated_at: field("updated_at")?,
        })
    }

    fn text_fields(&self) -> Vec<Field> {
        vec![self.title, self.body, self.tags, self.attachment]
    }

    fn text_field(&self, name: &str) -> Result<Field, IndexError> {
        match name {
            "title" => Ok(self.title),
            "body" => Ok(self.body),
            "tags" => Ok(self.tags),
            "attachment" => Ok(self.attachment),
            other => Err(IndexError::UnknownField(other.to_string())),
        }
    }

    fn filter_field(&self, name: &str) -> Result<Field, IndexError> {
        match name {
            "kb_locale_id" => Ok(self.kb_locale_id),
            "scope_id" => Ok(self.scope_id),
            "id" => Ok(self.id),
            other => Err(IndexError::UnknownField(other.to_string())),
        }
    }

    fn sort_field(&self, name: &str) -> Result<Field, IndexError> {
        match name {
            "id" => Ok(self.id),
            "title" => Ok(self.title),
            "created_at" => Ok(self.created_at),
            "updated_at" => Ok(self.updated_at),
            other => Err(IndexError::UnsortableField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Missing,
    Int(i64),
    Text(String),
}

fn document_key(content_type: ContentType, id: i64) -> String {
    format!("{}#{}", content_type.tag(), id)
}

/// Tantivy index wrapper
///
/// Stores one document per translation and answers searches with BM25 ranking,
/// optionally re-ordered by stored fields.
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    writer: Option<IndexWriter>,
    writer_heap_bytes: usize,
    fields: IndexFields,
    enabled: bool,
    default_limit: usize,
    index_path: Option<PathBuf>,
}

impl TantivyIndex {
    /// Open the index under `index_path`, creating it when missing
    pub fn open(index_path: PathBuf, config: &EngineConfig) -> Result<Self, IndexError> {
        let index = if index_path.join("meta.json").exists() {
            Index::open_in_dir(&index_path)
                .map_err(|e| IndexError::InitializationError(e.to_string()))?
        } else {
            std::fs::create_dir_all(&index_path)?;
            let (schema, _) = IndexFields::build_schema();
            Index::create_in_dir(&index_path, schema)
                .map_err(|e| IndexError::InitializationError(e.to_string()))?
        };

        Self::with_index(index, Some(index_path), config)
    }

    /// Index that lives only in memory
    pub fn in_memory(config: &EngineConfig) -> Result<Self, IndexError> {
        let (schema, _) = IndexFields::build_schema();
        Self::with_index(Index::create_in_ram(schema), None, config)
    }

    fn with_index(
        index: Index,
        index_path: Option<PathBuf>,
        config: &EngineConfig,
    ) -> Result<Self, IndexError> {
        let fields = IndexFields::from_schema(&index.schema())?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| IndexError::InitializationError(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: None,
            writer_heap_bytes: config.writer_heap_bytes,
            fields,
            enabled: config.enabled,
            default_limit: config.default_limit,
            index_path,
        })
    }

    /// Directory the index lives in, `None` for in-memory indexes
    pub fn path(&self) -> Option<&Path> {
        self.index_path.as_deref()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn writer(&mut self) -> Result<&mut IndexWriter, IndexError> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self
                .index
                .writer(self.writer_heap_bytes)
                .map_err(|e| IndexError::InitializationError(e.to_string()))?,
        };
        Ok(self.writer.insert(writer))
    }

    /// Insert a translation, replacing any previous version of it
    pub fn upsert(&mut self, document: &IndexDocument) -> Result<(), IndexError> {
        let f = self.fields;
        self.delete(document.content_type, document.id)?;

        let mut doc = TantivyDocument::default();
        doc.add_text(f.key, document_key(document.content_type, document.id));
        doc.add_i64(f.id, document.id);
        doc.add_text(f.type_tag, document.content_type.tag());
        doc.add_i64(f.kb_locale_id, document.kb_locale_id);
        if let Some(scope_id) = document.scope_id {
            doc.add_i64(f.scope_id, scope_id);
        }
        doc.add_text(f.title, &document.title);
        doc.add_text(f.body, &document.body);
        for tag in &document.tags {
            doc.add_text(f.tags, tag);
        }
        doc.add_text(f.attachment, &document.attachment);
        doc.add_i64(f.created_at, document.created_at);
        doc.add_i64(f.updated_at, document.updated_at);

        self.writer()?
            .add_document(doc)
            .map_err(|e| IndexError::InsertError(e.to_string()))?;

        Ok(())
    }

    pub fn delete(&mut self, content_type: ContentType, id: i64) -> Result<(), IndexError> {
        let term = Term::from_field_text(self.fields.key, &document_key(content_type, id));
        self.writer()?.delete_term(term);
        Ok(())
    }

    /// Commit all pending changes
    pub fn commit(&mut self) -> Result<(), IndexError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .commit()
                .map_err(|e| IndexError::InsertError(e.to_string()))?;
        }

        // Wait for reader to reload
        self.reader
            .reload()
            .map_err(|e| IndexError::SearchError(e.to_string()))?;

        Ok(())
    }

    /// Replace the whole index content
    pub fn rebuild(
        &mut self,
        documents: impl IntoIterator<Item = IndexDocument>,
    ) -> Result<usize, IndexError> {
        self.writer()?
            .delete_all_documents()
            .map_err(|e| IndexError::InsertError(e.to_string()))?;

        let mut count = 0;
        for document in documents {
            self.upsert(&document)?;
            count += 1;
        }
        self.commit()?;

        tracing::info!("Rebuilt search index with {} documents", count);
        Ok(count)
    }

    /// Get the number of documents in the index
    pub fn len(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn query_fields(
        &self,
        content_type: ContentType,
        options: &SearchOptions,
    ) -> Result<Vec<Field>, IndexError> {
        match options
            .query_fields_by_indexes
            .as_ref()
            .and_then(|by_index| by_index.get(content_type.tag()))
        {
            Some(names) => names.iter().map(|n| self.fields.text_field(n)).collect(),
            None => Ok(self.fields.text_fields()),
        }
    }

    fn text_query(&self, text: &str, fields: Vec<Field>) -> Box<dyn Query> {
        if text.is_empty() {
            return Box::new(AllQuery);
        }

        let parser = QueryParser::for_index(&self.index, fields);
        let (query, errors) = parser.parse_query_lenient(text);
        if !errors.is_empty() {
            tracing::debug!("Lenient parse of {:?} skipped: {:?}", text, errors);
        }
        query
    }

    fn sort_key(&self, doc: &TantivyDocument, options: &SearchOptions) -> Result<Vec<SortValue>, IndexError> {
        options
            .sort_by
            .iter()
            .map(|name| {
                let field = self.fields.sort_field(name)?;
                Ok(match doc.get_first(field) {
                    Some(value) => {
                        if let Some(number) = value.as_i64() {
                            SortValue::Int(number)
                        } else if let Some(text) = value.as_str() {
                            SortValue::Text(text.to_lowercase())
                        } else {
                            SortValue::Missing
                        }
                    }
                    None => SortValue::Missing,
                })
            })
            .collect()
    }

    fn load(
        &self,
        searcher: &tantivy::Searcher,
        addresses: Vec<(f32, DocAddress)>,
    ) -> Result<Vec<TantivyDocument>, IndexError> {
        addresses
            .into_iter()
            .map(|(_, address)| {
                searcher
                    .doc::<TantivyDocument>(address)
                    .map_err(|e| IndexError::SearchError(e.to_string()))
            })
            .collect()
    }
}

impl FullTextEngine for TantivyIndex {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn search(
        &self,
        query: &str,
        indexes: &[ContentType],
        options: &SearchOptions,
    ) -> Result<Vec<RawHit>, IndexError> {
        let limit = options.limit.unwrap_or(self.default_limit);
        let from = options.from.unwrap_or(0);
        if indexes.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let text = query.trim();
        let searcher = self.reader.searcher();

        // (type = index AND text matches that index's fields) for each index
        let mut per_index: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for &content_type in indexes {
            let type_term = Term::from_field_text(self.fields.type_tag, content_type.tag());
            let type_query: Box<dyn Query> =
                Box::new(TermQuery::new(type_term, IndexRecordOption::Basic));
            let text_query = self.text_query(text, self.query_fields(content_type, options)?);

            per_index.push((
                Occur::Should,
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, type_query),
                    (Occur::Must, text_query),
                ])),
            ));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, Box::new(BooleanQuery::new(per_index)))];

        for clause in options.must() {
            for (name, ids) in &clause.terms {
                let field = self.fields.filter_field(name)?;
                let terms: Vec<Term> = ids.iter().map(|id| Term::from_field_i64(field, *id)).collect();
                clauses.push((Occur::Must, Box::new(TermSetQuery::new(terms))));
            }
        }

        let combined = BooleanQuery::new(clauses);

        let documents = if options.sort_by.is_empty() {
            let top = searcher
                .search(&combined, &TopDocs::with_limit(limit).and_offset(from))
                .map_err(|e| IndexError::SearchError(e.to_string()))?;
            self.load(&searcher, top)?
        } else {
            let everything = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
            let top = searcher
                .search(&combined, &TopDocs::with_limit(everything))
                .map_err(|e| IndexError::SearchError(e.to_string()))?;

            let mut keyed = Vec::with_capacity(top.len());
            for doc in self.load(&searcher, top)? {
                keyed.push((self.sort_key(&doc, options)?, doc));
            }

            // stable, so equal keys keep relevance order
            keyed.sort_by(|(a, _), (b, _)| {
                for (i, (left, right)) in a.iter().zip(b.iter()).enumerate() {
                    let mut ordering = left.cmp(right);
                    if options.order_by.get(i) == Some(&SortDirection::Desc) {
                        ordering = ordering.reverse();
                    }
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });

            keyed
                .into_iter()
                .skip(from)
                .take(limit)
                .map(|(_, doc)| doc)
                .collect()
        };

        let highlight_fields = options.highlight_fields_by_indexes.as_ref();
        let mut generators: HashMap<(ContentType, Field), SnippetGenerator> = HashMap::new();
        let mut hits = Vec::with_capacity(documents.len());

        for doc in documents {
            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| IndexError::SearchError("Missing or invalid ID field".to_string()))?;

            let type_tag = doc
                .get_first(self.fields.type_tag)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let mut highlights = BTreeMap::new();
            let content_type = ContentType::from_tag(&type_tag);
            let names = content_type
                .zip(highlight_fields)
                .and_then(|(ct, by_index)| by_index.get(ct.tag()));

            if let (Some(content_type), Some(names)) = (content_type, names) {
                if !text.is_empty() {
                    for name in names {
                        let field = self.fields.text_field(name)?;
                        let generator = match generators.entry((content_type, field)) {
                            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                            std::collections::hash_map::Entry::Vacant(entry) => {
                                let query =
                                    self.text_query(text, self.query_fields(content_type, options)?);
                                entry.insert(SnippetGenerator::create(&searcher, &*query, field)?)
                            }
                        };

                        let snippet = generator.snippet_from_doc(&doc);
                        if !snippet.is_empty() {
                            highlights.insert(name.clone(), snippet.to_html());
                        }
                    }
                }
            }

            hits.push(RawHit {
                id: RawId::Int(id),
                type_tag,
                highlights,
            });
        }

        tracing::debug!(
            "Index returned {} hits for {:?} in {:?}",
            hits.len(),
            text,
            indexes
        );

        Ok(hits)
    }
}
