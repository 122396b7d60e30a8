//! Probe a Python interpreter for search paths and runtime facts.

use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;

/// Failures while probing an interpreter. Callers fall back to the
/// vendored stdlib table and explicit search paths when probing fails.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run {python}: {source}")]
    Spawn {
        python: String,
        source: std::io::Error,
    },
    #[error("{python} exited with {status}")]
    Exit {
        python: String,
        status: std::process::ExitStatus,
    },
    #[error("unreadable probe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Facts captured from one interpreter. Field names match the JSON the
/// probe script prints.
#[derive(Debug, Clone, Deserialize)]
pub struct PythonEnv {
    /// `sys.path` entries, empty strings removed.
    pub search_paths: Vec<PathBuf>,
    /// The standard library directory.
    pub stdlib_dir: Option<PathBuf>,
    /// `sys.builtin_module_names`.
    pub builtins: Vec<String>,
    /// Runtime tag, e.g. `python3.12`. Matches the Lambda runtime
    /// identifier scheme.
    pub runtime: String,
}

const PROBE_SCRIPT: &str = r#"import json, sys, sysconfig
print(json.dumps({
    "search_paths": [p for p in sys.path if p],
    "stdlib_dir": sysconfig.get_path("stdlib"),
    "builtins": list(sys.builtin_module_names),
    "runtime": "python{}.{}".format(sys.version_info[0], sys.version_info[1]),
}))"#;

impl PythonEnv {
    /// Run the interpreter once with `-c` and capture its module search
    /// paths, stdlib location, builtin names, and version tag.
    pub fn probe(python: &str) -> Result<Self, ProbeError> {
        let output = Command::new(python)
            .arg("-c")
            .arg(PROBE_SCRIPT)
            .output()
            .map_err(|source| ProbeError::Spawn {
                python: python.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(ProbeError::Exit {
                python: python.to_string(),
                status: output.status,
            });
        }
        let env: Self = serde_json::from_slice(&output.stdout)?;
        tracing::debug!(
            "probed {python}: {} search paths, runtime {}",
            env.search_paths.len(),
            env.runtime
        );
        Ok(env)
    }
}

/// Check a name against the vendored standard library table.
pub fn is_stdlib_module(name: &str) -> bool {
    STDLIB_MODULES.binary_search(&name).is_ok()
}

/// Top-level standard library module names, vendored so classification
/// works without an interpreter on PATH. Probed builtins supplement
/// this at runtime. Sorted for binary search.
pub const STDLIB_MODULES: &[&str] = &[
    "__future__",
    "_thread",
    "abc",
    "aifc",
    "argparse",
    "array",
    "ast",
    "asyncio",
    "atexit",
    "audioop",
    "base64",
    "bdb",
    "binascii",
    "bisect",
    "builtins",
    "bz2",
    "cProfile",
    "calendar",
    "cgi",
    "cgitb",
    "chunk",
    "cmath",
    "cmd",
    "code",
    "codecs",
    "codeop",
    "collections",
    "colorsys",
    "compileall",
    "concurrent",
    "configparser",
    "contextlib",
    "contextvars",
    "copy",
    "copyreg",
    "crypt",
    "csv",
    "ctypes",
    "curses",
    "dataclasses",
    "datetime",
    "dbm",
    "decimal",
    "difflib",
    "dis",
    "doctest",
    "email",
    "encodings",
    "ensurepip",
    "enum",
    "errno",
    "faulthandler",
    "fcntl",
    "filecmp",
    "fileinput",
    "fnmatch",
    "fractions",
    "ftplib",
    "functools",
    "gc",
    "getopt",
    "getpass",
    "gettext",
    "glob",
    "graphlib",
    "grp",
    "gzip",
    "hashlib",
    "heapq",
    "hmac",
    "html",
    "http",
    "imaplib",
    "imghdr",
    "importlib",
    "inspect",
    "io",
    "ipaddress",
    "itertools",
    "json",
    "keyword",
    "linecache",
    "locale",
    "logging",
    "lzma",
    "mailbox",
    "mailcap",
    "marshal",
    "math",
    "mimetypes",
    "mmap",
    "modulefinder",
    "msilib",
    "msvcrt",
    "multiprocessing",
    "netrc",
    "nis",
    "nntplib",
    "nt",
    "ntpath",
    "numbers",
    "opcode",
    "operator",
    "optparse",
    "os",
    "ossaudiodev",
    "pathlib",
    "pdb",
    "pickle",
    "pickletools",
    "pipes",
    "pkgutil",
    "platform",
    "plistlib",
    "poplib",
    "posix",
    "posixpath",
    "pprint",
    "profile",
    "pstats",
    "pty",
    "pwd",
    "py_compile",
    "pyclbr",
    "pydoc",
    "pyexpat",
    "queue",
    "quopri",
    "random",
    "re",
    "readline",
    "reprlib",
    "resource",
    "rlcompleter",
    "runpy",
    "sched",
    "secrets",
    "select",
    "selectors",
    "shelve",
    "shlex",
    "shutil",
    "signal",
    "site",
    "smtplib",
    "sndhdr",
    "socket",
    "socketserver",
    "spwd",
    "sqlite3",
    "ssl",
    "stat",
    "statistics",
    "string",
    "stringprep",
    "struct",
    "subprocess",
    "sunau",
    "symtable",
    "sys",
    "sysconfig",
    "syslog",
    "tabnanny",
    "tarfile",
    "telnetlib",
    "tempfile",
    "termios",
    "test",
    "textwrap",
    "this",
    "threading",
    "time",
    "timeit",
    "tkinter",
    "token",
    "tokenize",
    "tomllib",
    "trace",
    "traceback",
    "tracemalloc",
    "tty",
    "turtle",
    "types",
    "typing",
    "unicodedata",
    "unittest",
    "urllib",
    "uu",
    "uuid",
    "venv",
    "warnings",
    "wave",
    "weakref",
    "webbrowser",
    "winreg",
    "winsound",
    "wsgiref",
    "xdrlib",
    "xml",
    "xmlrpc",
    "zipapp",
    "zipfile",
    "zipimport",
    "zlib",
    "zoneinfo",
];
