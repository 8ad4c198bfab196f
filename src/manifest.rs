//! # Manifest Schema and Parsing
//!
//! This module defines the data structures that represent a `git-ws.toml`
//! manifest file, plus the logic for loading, validating, emitting and
//! upgrading it.
//!
//! ## Key Components
//!
//! - **`ManifestSpec`**: the on-disk form of a manifest. Remotes, defaults,
//!   group filters, dependencies and link/copy file references, exactly as
//!   the user wrote them.
//! - **`ProjectSpec`**: a single declarative dependency entry.
//! - **`Remote`**, **`Defaults`**, **`FileRef`**: the remaining sections.
//!
//! ## Parsing
//!
//! Files are parsed with `toml_edit` so that user comments and unknown
//! top-level fields survive rewrites. Loading walks the parsed document
//! first and reports precise structural errors ([`ManifestErrorKind`])
//! before the typed deserialization runs. Unknown *top-level* keys are
//! preserved for forward compatibility; unknown keys inside known sections
//! are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item};

use crate::error::{Error, ManifestErrorKind, Result};

/// Current manifest schema version.
pub const MANIFEST_VERSION: i64 = 1;

/// Default manifest file name, relative to the project directory.
pub const MANIFEST_PATH_DEFAULT: &str = "git-ws.toml";

/// Remote alias: a short name for a directory of repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// Name of the remote. Must be unique within the manifest.
    pub name: String,

    /// URL prefix. The dependency `sub-url` or `name` is appended.
    #[serde(rename = "url-base")]
    pub url_base: String,
}

/// Default values applied to dependencies which do not specify them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Defaults {
    /// Remote used when a dependency names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Revision used when a dependency names none. Tag or branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Groups for dependencies which declare none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Groups activated in dependency manifests which declare none.
    #[serde(
        default,
        rename = "with-groups",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub with_groups: Vec<String>,

    /// Submodule handling for dependencies which declare none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submodules: Option<bool>,
}

/// A file to be linked or copied from a project into the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Source, relative to the declaring project directory.
    pub src: String,

    /// Destination, relative to the workspace root directory.
    pub dest: String,

    /// Optional groups. The reference is only created when selected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// Project dependency specification.
///
/// A `ProjectSpec` is the user interface: the options which can be written
/// in the manifest file. The resolver turns it into a
/// [`Project`](crate::resolver::Project) with all derived information.
///
/// Restrictions:
///
/// * `remote` and `url` are mutually exclusive.
/// * `url` and `sub-url` are likewise mutually exclusive.
/// * `sub-url` requires a `remote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Dependency name.
    pub name: String,

    /// Remote alias name. Must be declared in the `remotes` section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// URL relative to the remote's `url-base`.
    #[serde(rename = "sub-url", skip_serializing_if = "Option::is_none")]
    pub sub_url: Option<String>,

    /// Absolute URL, or URL relative to the repository containing this
    /// manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Revision to be checked out: branch, tag or 40-char SHA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Path within the workspace. The `name` is used as default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Path to the dependency's own manifest, relative to `path`.
    #[serde(
        rename = "manifest-path",
        skip_serializing_if = "Option::is_none"
    )]
    pub manifest_path: Option<String>,

    /// Dependency groups this entry belongs to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Groups activated within the dependency's own manifest.
    #[serde(
        default,
        rename = "with-groups",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub with_groups: Vec<String>,

    /// Whether submodules are initialized and updated. Default is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submodules: Option<bool>,

    /// Files to be symlinked into the workspace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linkfiles: Vec<FileRef>,

    /// Files to be copied into the workspace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copyfiles: Vec<FileRef>,
}

impl ProjectSpec {
    /// Create a minimal spec with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectSpec {
            name: name.into(),
            remote: None,
            sub_url: None,
            url: None,
            revision: None,
            path: None,
            manifest_path: None,
            groups: Vec::new(),
            with_groups: Vec::new(),
            submodules: None,
            linkfiles: Vec::new(),
            copyfiles: Vec::new(),
        }
    }

    /// Effective workspace path of this dependency.
    pub fn effective_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// Effective manifest path, relative to the dependency directory.
    pub fn effective_manifest_path(&self) -> &str {
        self.manifest_path.as_deref().unwrap_or(MANIFEST_PATH_DEFAULT)
    }
}

/// The on-disk form of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSpec {
    /// Manifest schema version.
    #[serde(default = "default_version")]
    pub version: i64,

    /// Remote aliases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remotes: Vec<Remote>,

    /// Group filter expressions, order-significant.
    #[serde(
        default,
        rename = "group-filters",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub group_filters: Vec<String>,

    /// Default values for dependencies.
    #[serde(default, skip_serializing_if = "defaults_is_empty")]
    pub defaults: Defaults,

    /// Dependency projects, order-significant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ProjectSpec>,

    /// Files of the enclosing project to be symlinked into the workspace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linkfiles: Vec<FileRef>,

    /// Files of the enclosing project to be copied into the workspace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copyfiles: Vec<FileRef>,
}

fn default_version() -> i64 {
    MANIFEST_VERSION
}

fn defaults_is_empty(defaults: &Defaults) -> bool {
    defaults == &Defaults::default()
}

impl Default for ManifestSpec {
    fn default() -> Self {
        ManifestSpec {
            version: MANIFEST_VERSION,
            remotes: Vec::new(),
            group_filters: Vec::new(),
            defaults: Defaults::default(),
            dependencies: Vec::new(),
            linkfiles: Vec::new(),
            copyfiles: Vec::new(),
        }
    }
}

impl ManifestSpec {
    /// Load a manifest from `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::ManifestNotFound`] if the file does not exist.
    /// - [`Error::ManifestSchemaTooNew`] for a future schema version.
    /// - [`Error::ManifestInvalid`] on syntax or schema violations.
    pub fn load(path: &Path) -> Result<ManifestSpec> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        Self::parse(&content, path)
    }

    /// Parse manifest `content`; `path` is used for error reporting only.
    pub fn parse(content: &str, path: &Path) -> Result<ManifestSpec> {
        let mut doc = parse_document(content, path)?;
        check_version(&mut doc, path)?;
        check_structure(&doc, path)?;
        let spec: ManifestSpec =
            toml_edit::de::from_document(doc).map_err(|err| Error::ManifestInvalid {
                path: path.to_path_buf(),
                kind: ManifestErrorKind::Syntax {
                    message: err.to_string(),
                },
            })?;
        spec.validate(path)?;
        Ok(spec)
    }

    /// Validate semantic constraints which the structural walk cannot see.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |kind| Error::ManifestInvalid {
            path: path.to_path_buf(),
            kind,
        };

        let mut remote_names = Vec::new();
        for remote in &self.remotes {
            check_identifier(&remote.name).map_err(&invalid)?;
            if remote_names.contains(&remote.name.as_str()) {
                return Err(invalid(ManifestErrorKind::DuplicateRemote {
                    name: remote.name.clone(),
                }));
            }
            remote_names.push(&remote.name);
        }

        if let Some(remote) = &self.defaults.remote {
            if !remote_names.contains(&remote.as_str()) {
                return Err(invalid(ManifestErrorKind::UnknownRemote {
                    name: remote.clone(),
                }));
            }
        }
        for group in self.defaults.groups.iter().chain(&self.defaults.with_groups) {
            check_identifier(group).map_err(&invalid)?;
        }

        for expr in &self.group_filters {
            crate::groups::GroupFilter::parse(expr).map_err(|err| {
                invalid(ManifestErrorKind::Syntax {
                    message: err.to_string(),
                })
            })?;
        }

        for dep in &self.dependencies {
            if dep.name.is_empty() {
                return Err(invalid(ManifestErrorKind::MissingRequired {
                    field: "dependencies.name".to_string(),
                }));
            }
            if dep.url.is_some() && (dep.remote.is_some() || dep.sub_url.is_some()) {
                return Err(invalid(ManifestErrorKind::ConflictingUrlSources {
                    name: dep.name.clone(),
                }));
            }
            if dep.sub_url.is_some() && dep.remote.is_none() {
                return Err(invalid(ManifestErrorKind::InvalidSubUrl {
                    name: dep.name.clone(),
                }));
            }
            if let Some(remote) = &dep.remote {
                if !remote_names.contains(&remote.as_str()) {
                    return Err(invalid(ManifestErrorKind::UnknownRemote {
                        name: remote.clone(),
                    }));
                }
            }
            for group in dep.groups.iter().chain(&dep.with_groups) {
                check_identifier(group).map_err(&invalid)?;
            }
            for fileref in dep.linkfiles.iter().chain(&dep.copyfiles) {
                for group in &fileref.groups {
                    check_identifier(group).map_err(&invalid)?;
                }
            }
        }
        Ok(())
    }

    /// Serialize the manifest, embedding the schema documentation comments.
    pub fn dump(&self) -> String {
        let mut doc = self.to_document();
        decorate(&mut doc);
        doc.to_string()
    }

    /// Serialize the manifest into `existing`, keeping any user comments
    /// and unknown fields the document already carries.
    pub fn dump_into(&self, existing: &mut DocumentMut) -> String {
        let new_doc = self.to_document();
        for (key, item) in new_doc.iter() {
            existing[key] = item.clone();
        }
        // Sections emptied since the last write must go, or the file would
        // keep stale entries.
        for key in [
            "remotes",
            "group-filters",
            "defaults",
            "dependencies",
            "linkfiles",
            "copyfiles",
        ] {
            if new_doc.get(key).is_none() {
                existing.remove(key);
            }
        }
        existing.to_string()
    }

    /// Save the manifest at `path`, atomically.
    ///
    /// With `update`, user comments and additional fields of an already
    /// existing file are kept. Otherwise the file is rewritten from the
    /// documented template.
    pub fn save(&self, path: &Path, update: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = if update && path.exists() {
            let raw = fs::read_to_string(path)?;
            let mut doc = parse_document(&raw, path)?;
            self.dump_into(&mut doc)
        } else {
            self.dump()
        };
        write_atomic(path, &content)
    }

    /// Rewrite the manifest at `path` at the latest schema version.
    ///
    /// User values, comments and unknown fields are preserved; the schema
    /// documentation comments are regenerated and `version` is normalized.
    pub fn upgrade(path: &Path) -> Result<()> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        let spec = Self::parse(&content, path)?;
        let old_doc = parse_document(&content, path)?;

        let mut new_doc = spec.to_document();
        // Carry over user fields first, then let the canonical values win.
        for (key, item) in old_doc.iter() {
            if key != "version" && new_doc.get(key).is_none() {
                new_doc[key] = item.clone();
            }
        }
        decorate(&mut new_doc);
        write_atomic(path, &new_doc.to_string())
    }

    fn to_document(&self) -> DocumentMut {
        // Serialization of this type cannot fail: all keys are strings and
        // every value maps to a TOML type.
        toml_edit::ser::to_document(self).unwrap_or_default()
    }
}

/// Validate an identifier against `[A-Za-z_][A-Za-z0-9_-]*`.
pub fn check_identifier(value: &str) -> std::result::Result<(), ManifestErrorKind> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static regex");
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ManifestErrorKind::BadIdentifier {
            value: value.to_string(),
        })
    }
}

fn parse_document(content: &str, path: &Path) -> Result<DocumentMut> {
    content
        .parse::<DocumentMut>()
        .map_err(|err| Error::ManifestInvalid {
            path: path.to_path_buf(),
            kind: ManifestErrorKind::Syntax {
                message: err.to_string(),
            },
        })
}

/// Check the schema version and normalize the legacy string form.
fn check_version(doc: &mut DocumentMut, path: &Path) -> Result<()> {
    let version = match doc.get("version") {
        None => MANIFEST_VERSION,
        Some(item) => match item.as_integer() {
            Some(version) => version,
            // Early manifests carried a "1.0"-style string version.
            None => match item.as_str() {
                Some("0.9") | Some("1.0") => MANIFEST_VERSION,
                _ => {
                    return Err(Error::ManifestInvalid {
                        path: path.to_path_buf(),
                        kind: ManifestErrorKind::TypeMismatch {
                            field: "version".to_string(),
                            expected: "integer".to_string(),
                        },
                    })
                }
            },
        },
    };
    if version > MANIFEST_VERSION {
        return Err(Error::ManifestSchemaTooNew {
            path: path.to_path_buf(),
            version,
            supported: MANIFEST_VERSION,
        });
    }
    doc["version"] = toml_edit::value(MANIFEST_VERSION);
    Ok(())
}

/// Expected TOML type of a known field, for the structural walk.
enum FieldKind {
    Str,
    Bool,
    StrArray,
    FileRefs,
}

const PROJECT_FIELDS: &[(&str, FieldKind, bool)] = &[
    ("name", FieldKind::Str, true),
    ("remote", FieldKind::Str, false),
    ("sub-url", FieldKind::Str, false),
    ("url", FieldKind::Str, false),
    ("revision", FieldKind::Str, false),
    ("path", FieldKind::Str, false),
    ("manifest-path", FieldKind::Str, false),
    ("groups", FieldKind::StrArray, false),
    ("with-groups", FieldKind::StrArray, false),
    ("submodules", FieldKind::Bool, false),
    ("linkfiles", FieldKind::FileRefs, false),
    ("copyfiles", FieldKind::FileRefs, false),
];

const REMOTE_FIELDS: &[(&str, FieldKind, bool)] = &[
    ("name", FieldKind::Str, true),
    ("url-base", FieldKind::Str, true),
];

const DEFAULTS_FIELDS: &[(&str, FieldKind, bool)] = &[
    ("remote", FieldKind::Str, false),
    ("revision", FieldKind::Str, false),
    ("groups", FieldKind::StrArray, false),
    ("with-groups", FieldKind::StrArray, false),
    ("submodules", FieldKind::Bool, false),
];

const FILEREF_FIELDS: &[(&str, FieldKind, bool)] = &[
    ("src", FieldKind::Str, true),
    ("dest", FieldKind::Str, true),
    ("groups", FieldKind::StrArray, false),
];

/// Walk the parsed document and report precise structural errors before
/// the typed deserialization runs. Unknown top-level keys are tolerated
/// (forward compatibility); unknown keys inside known sections are not.
fn check_structure(doc: &DocumentMut, path: &Path) -> Result<()> {
    let invalid = |kind| Error::ManifestInvalid {
        path: path.to_path_buf(),
        kind,
    };

    if let Some(item) = doc.get("remotes") {
        check_entries(item, "remotes", REMOTE_FIELDS, &invalid)?;
    }
    if let Some(item) = doc.get("defaults") {
        let table = item.as_table_like().ok_or_else(|| {
            invalid(ManifestErrorKind::TypeMismatch {
                field: "defaults".to_string(),
                expected: "table".to_string(),
            })
        })?;
        check_fields(
            table
                .iter()
                .map(|(key, item)| (key, TomlVal::Item(item)))
                .collect(),
            "defaults",
            DEFAULTS_FIELDS,
            &invalid,
        )?;
    }
    if let Some(item) = doc.get("group-filters") {
        check_string_array(item, "group-filters", &invalid)?;
    }
    if let Some(item) = doc.get("dependencies") {
        check_entries(item, "dependencies", PROJECT_FIELDS, &invalid)?;
    }
    for key in ["linkfiles", "copyfiles"] {
        if let Some(item) = doc.get(key) {
            check_entries(item, key, FILEREF_FIELDS, &invalid)?;
        }
    }
    Ok(())
}

/// A borrowed TOML value, regardless of whether it sits in a table section
/// or an inline table.
#[derive(Clone, Copy)]
enum TomlVal<'a> {
    Item(&'a Item),
    Value(&'a toml_edit::Value),
}

impl<'a> TomlVal<'a> {
    fn as_str(self) -> Option<&'a str> {
        match self {
            TomlVal::Item(item) => item.as_str(),
            TomlVal::Value(value) => value.as_str(),
        }
    }

    fn as_bool(self) -> Option<bool> {
        match self {
            TomlVal::Item(item) => item.as_bool(),
            TomlVal::Value(value) => value.as_bool(),
        }
    }

    fn is_string_array(self) -> bool {
        let array = match self {
            TomlVal::Item(item) => item.as_array(),
            TomlVal::Value(value) => value.as_array(),
        };
        array.is_some_and(|array| array.iter().all(|value| value.is_str()))
    }

    /// Interpret the value as an array of tables and return the field list
    /// of each entry. `None` if it is no array of tables at all.
    fn entries(self) -> Option<Vec<Vec<(&'a str, TomlVal<'a>)>>> {
        match self {
            TomlVal::Item(Item::ArrayOfTables(aot)) => Some(
                aot.iter()
                    .map(|table| {
                        table
                            .iter()
                            .map(|(key, item)| (key, TomlVal::Item(item)))
                            .collect()
                    })
                    .collect(),
            ),
            TomlVal::Item(Item::Value(value)) => TomlVal::Value(value).entries(),
            TomlVal::Value(value) => {
                let array = value.as_array()?;
                let mut entries = Vec::new();
                for value in array.iter() {
                    let table = value.as_inline_table()?;
                    entries.push(
                        table
                            .iter()
                            .map(|(key, value)| (key, TomlVal::Value(value)))
                            .collect(),
                    );
                }
                Some(entries)
            }
            _ => None,
        }
    }
}

fn check_entries(
    item: &Item,
    section: &str,
    fields: &[(&str, FieldKind, bool)],
    invalid: &dyn Fn(ManifestErrorKind) -> Error,
) -> Result<()> {
    let entries = TomlVal::Item(item).entries().ok_or_else(|| {
        invalid(ManifestErrorKind::TypeMismatch {
            field: section.to_string(),
            expected: "array of tables".to_string(),
        })
    })?;
    for entry in entries {
        check_fields(entry, section, fields, invalid)?;
    }
    Ok(())
}

fn check_fields(
    entry: Vec<(&str, TomlVal<'_>)>,
    section: &str,
    fields: &[(&str, FieldKind, bool)],
    invalid: &dyn Fn(ManifestErrorKind) -> Error,
) -> Result<()> {
    let mut seen = Vec::new();
    for (key, value) in entry {
        let field = format!("{section}.{key}");
        let spec = fields.iter().find(|(name, _, _)| *name == key);
        let Some((_, kind, _)) = spec else {
            return Err(invalid(ManifestErrorKind::UnknownField { field }));
        };
        let matches = match kind {
            FieldKind::Str => value.as_str().is_some(),
            FieldKind::Bool => value.as_bool().is_some(),
            FieldKind::StrArray => value.is_string_array(),
            FieldKind::FileRefs => match value.entries() {
                Some(entries) => {
                    for entry in entries {
                        check_fields(entry, &field, FILEREF_FIELDS, invalid)?;
                    }
                    true
                }
                None => false,
            },
        };
        if !matches {
            return Err(invalid(ManifestErrorKind::TypeMismatch {
                field,
                expected: kind_name(kind).to_string(),
            }));
        }
        seen.push(key.to_string());
    }
    for (name, _, required) in fields {
        if *required && !seen.iter().any(|key| key == name) {
            return Err(invalid(ManifestErrorKind::MissingRequired {
                field: format!("{section}.{name}"),
            }));
        }
    }
    Ok(())
}

fn kind_name(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Str => "string",
        FieldKind::Bool => "boolean",
        FieldKind::StrArray => "array of strings",
        FieldKind::FileRefs => "array of tables",
    }
}

fn check_string_array(
    item: &Item,
    field: &str,
    invalid: &dyn Fn(ManifestErrorKind) -> Error,
) -> Result<()> {
    let ok = item
        .as_array()
        .is_some_and(|array| array.iter().all(|value| value.is_str()));
    if ok {
        Ok(())
    } else {
        Err(invalid(ManifestErrorKind::TypeMismatch {
            field: field.to_string(),
            expected: "array of strings".to_string(),
        }))
    }
}

/// Documentation comments emitted in front of the manifest sections.
const HEADER_DOC: &str = "\
# Git Workspace manifest, schema version 1.
#
# Sections:
#
# * remotes:       short names for directories of repositories. Only needed
#                  when dependencies live on other servers than this one.
#                  Fields: name (required), url-base (required).
# * defaults:      values used by dependencies which do not specify them.
#                  Fields: remote, revision, groups, with-groups, submodules.
# * group-filters: ordered list of '+group[@path]' / '-group[@path]'
#                  expressions selecting optional dependency groups.
#                  Later entries override earlier ones.
# * dependencies:  the git clones this project needs to operate.
#                  Fields: name (required), remote, sub-url, url, revision,
#                  path, manifest-path, groups, with-groups, submodules,
#                  linkfiles, copyfiles.
#
# Restrictions:
#
# * 'remote' and 'url' are mutually exclusive.
# * 'url' and 'sub-url' are mutually exclusive.
# * 'sub-url' requires a 'remote'.
#
# A dependency without 'remote' and 'url' defaults to a sibling of this
# repository on the same server: '../{name}', carrying a '.git' suffix if
# this repository uses one.
";

const REMOTES_DOC: &str = "\n\n# Remotes: directories of repositories.\n# Example:\n#   [[remotes]]\n#   name = \"myremote\"\n#   url-base = \"https://github.com/myuser\"\n";
const DEFAULTS_DOC: &str = "\n\n# Defaults for dependencies. A default 'revision' (e.g. \"main\") is\n# recommended; without one, revisions are left unmanaged.\n";
const DEPENDENCIES_DOC: &str = "\n\n# Dependencies. Example:\n#   [[dependencies]]\n#   name = \"mylib\"\n#   revision = \"main\"\n";

/// Attach the schema documentation comments to `doc`.
fn decorate(doc: &mut DocumentMut) {
    if let Some((mut key, _)) = doc.get_key_value_mut("version") {
        key.leaf_decor_mut().set_prefix(HEADER_DOC);
    }
    for (name, comment) in [
        ("remotes", REMOTES_DOC),
        ("defaults", DEFAULTS_DOC),
        ("dependencies", DEPENDENCIES_DOC),
    ] {
        match doc.get_mut(name) {
            Some(Item::ArrayOfTables(aot)) => {
                if let Some(first) = aot.iter_mut().next() {
                    first.decor_mut().set_prefix(comment);
                }
            }
            Some(Item::Table(table)) => {
                table.decor_mut().set_prefix(comment);
            }
            _ => {}
        }
    }
}

/// Write `content` to `path` atomically via a sibling temp file.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp: PathBuf = match path.file_name() {
        Some(name) => {
            let mut tmp_name = name.to_os_string();
            tmp_name.push(".tmp");
            path.with_file_name(tmp_name)
        }
        None => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid path: {}", path.display()),
            )))
        }
    };
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
