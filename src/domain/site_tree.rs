//! Navigation hierarchy derived from the directory layout.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::domain::{DocPath, Document};

/// A page as it appears in navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEntry {
    pub path: DocPath,
    pub title: String,
    /// Output path relative to the site root, e.g. `memory/stack.html`.
    pub url: String,
}

/// A directory in the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteNode {
    /// Directory name; empty for the root.
    pub name: String,
    /// Directory path relative to the root; empty for the root.
    pub dir: String,
    /// Display title: the landing page's title, else the directory name.
    pub title: String,
    /// The directory's landing page (`README.md` or `index.md`).
    pub index: Option<PageEntry>,
    /// Other pages, by file name.
    pub pages: Vec<PageEntry>,
    /// Subdirectories, by name.
    pub children: Vec<SiteNode>,
}

impl SiteNode {
    fn walk<'a>(&'a self, out: &mut Vec<&'a PageEntry>) {
        if let Some(index) = &self.index {
            out.push(index);
        }
        out.extend(self.pages.iter());
        for child in &self.children {
            child.walk(out);
        }
    }
}

/// The resolved navigation hierarchy across all documents.
///
/// Built once per run from the accepted documents and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteTree {
    root: SiteNode,
    #[serde(skip)]
    urls: HashMap<DocPath, String>,
}

#[derive(Default)]
struct NodeBuilder {
    index: Option<PageEntry>,
    pages: Vec<PageEntry>,
    children: BTreeMap<String, NodeBuilder>,
}

impl NodeBuilder {
    fn finish(self, name: String, dir: String) -> SiteNode {
        let title = self
            .index
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| name.clone());
        let children = self
            .children
            .into_iter()
            .map(|(child_name, builder)| {
                let child_dir = if dir.is_empty() {
                    child_name.clone()
                } else {
                    format!("{dir}/{child_name}")
                };
                builder.finish(child_name, child_dir)
            })
            .collect();
        SiteNode {
            name,
            dir,
            title,
            index: self.index,
            pages: self.pages,
            children,
        }
    }
}

fn landing_key(doc: &Document) -> u8 {
    doc.landing_rank().unwrap_or(u8::MAX)
}

impl SiteTree {
    /// Builds the tree. Documents are placed in lexicographic path order,
    /// except that a directory's preferred landing page comes first.
    pub fn build(documents: &[Document]) -> Self {
        let mut sorted: Vec<&Document> = documents.iter().collect();
        sorted.sort_by(|a, b| {
            a.path()
                .dir()
                .cmp(b.path().dir())
                .then_with(|| landing_key(a).cmp(&landing_key(b)))
                .then_with(|| a.path().cmp(b.path()))
        });

        let mut root = NodeBuilder::default();
        let mut urls = HashMap::new();
        let mut used: HashSet<String> = HashSet::new();

        for doc in sorted {
            let mut node = &mut root;
            for segment in doc.path().dir_segments() {
                node = node.children.entry(segment.to_string()).or_default();
            }

            let landing = doc.is_index() && node.index.is_none();
            let url = allocate_url(doc.path(), landing, &mut used);
            urls.insert(doc.path().clone(), url.clone());

            let entry = PageEntry {
                path: doc.path().clone(),
                title: doc.title().to_string(),
                url,
            };
            if landing {
                node.index = Some(entry);
            } else {
                node.pages.push(entry);
            }
        }

        Self {
            root: root.finish(String::new(), String::new()),
            urls,
        }
    }

    pub fn root(&self) -> &SiteNode {
        &self.root
    }

    /// Pages in navigation order: landing page, pages, then subdirectories.
    pub fn pages(&self) -> Vec<&PageEntry> {
        let mut out = Vec::new();
        self.root.walk(&mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Output path of a document relative to the site root.
    pub fn url_for(&self, path: &DocPath) -> Option<&str> {
        self.urls.get(path).map(String::as_str)
    }
}

fn allocate_url(path: &DocPath, landing: bool, used: &mut HashSet<String>) -> String {
    let dir = path.dir();
    let stem = if landing { "index" } else { path.file_stem() };
    let base = if dir.is_empty() {
        stem.to_string()
    } else {
        format!("{dir}/{stem}")
    };

    let mut candidate = format!("{base}.html");
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{base}-{n}.html");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Returns a link from one output page to another, relative to the first.
pub fn relative_url(from: &str, to: &str) -> String {
    let depth = from.matches('/').count();
    format!("{}{}", "../".repeat(depth), to)
}
