#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rpcent::protocol::rpc::{read_record, write_fragment};
use rpcent::xdr::yp::{self, ypreq_key, ypreq_nokey, ypresp_key_val, ypresp_val, ypstat};
use rpcent::xdr::{self, rpc, Serialize};

/// The registry used across the integration tests.
pub const REGISTRY: &str = "\
portmapper 100000 portmap sunrpc
rstatd 100001 rstat rup perfmeter
# a comment
rusersd 100002
";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn registry(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create registry");
    file.write_all(contents.as_bytes()).expect("write registry");
    file
}

/// Calls served so far, per procedure.
#[derive(Debug, Default)]
pub struct Counters {
    pub domain: AtomicUsize,
    pub first: AtomicUsize,
    pub next: AtomicUsize,
    pub matches: AtomicUsize,
}

impl Counters {
    pub fn map_calls(&self) -> usize {
        self.first.load(Ordering::SeqCst)
            + self.next.load(Ordering::SeqCst)
            + self.matches.load(Ordering::SeqCst)
    }
}

struct Served {
    domain: String,
    map: Option<BTreeMap<Vec<u8>, Vec<u8>>>,
    fail_next: AtomicBool,
    counters: Arc<Counters>,
}

/// An in-process YP server carrying an `rpc.bynumber` map built from
/// registry text, or no such map at all.
pub struct YpServer {
    pub addr: String,
    pub counters: Arc<Counters>,
    served: Arc<Served>,
}

impl YpServer {
    /// Serves `domain`; `registry` is `None` for a server without the map.
    pub fn start(domain: &str, registry: Option<&str>) -> YpServer {
        let map = registry.map(|text| {
            let mut map = BTreeMap::new();
            for line in text.lines() {
                if let Some(entry) = rpcent::parse::interpret(line.as_bytes()) {
                    map.entry(entry.number.to_string().into_bytes())
                        .or_insert_with(|| line.as_bytes().to_vec());
                }
            }
            map
        });
        let counters = Arc::new(Counters::default());
        let served = Arc::new(Served {
            domain: domain.to_string(),
            map,
            fail_next: AtomicBool::new(false),
            counters: counters.clone(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind YP server");
        let addr = listener.local_addr().expect("local addr").to_string();
        let shared = served.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let served = shared.clone();
                thread::spawn(move || serve_connection(stream, &served));
            }
        });
        YpServer { addr, counters, served }
    }

    /// Makes the next map query fail with a server-side error.
    pub fn fail_next(&self) {
        self.served.fail_next.store(true, Ordering::SeqCst);
    }
}

fn serve_connection(mut stream: TcpStream, served: &Served) {
    while let Ok(record) = read_record(&mut stream) {
        let Some(reply) = handle(record, served) else { return };
        if write_fragment(&mut stream, &reply).is_err() {
            return;
        }
    }
}

fn handle(record: Vec<u8>, served: &Served) -> Option<Vec<u8>> {
    let mut input = Cursor::new(record);
    let msg = xdr::deserialize::<rpc::rpc_msg>(&mut input).ok()?;
    let rpc::rpc_body::CALL(call) = msg.body else { return None };
    let xid = msg.xid;

    let mut output = Vec::new();
    if call.prog != yp::PROGRAM {
        rpc::prog_unavail_reply_message(xid).serialize(&mut output).ok()?;
        return Some(output);
    }
    if call.vers != yp::VERSION {
        rpc::prog_mismatch_reply_message(xid, yp::VERSION).serialize(&mut output).ok()?;
        return Some(output);
    }

    let counters = &served.counters;
    let mut results = Vec::new();
    match call.proc {
        1 => {
            counters.domain.fetch_add(1, Ordering::SeqCst);
            let domain = xdr::deserialize::<String>(&mut input).ok()?;
            (domain == served.domain).serialize(&mut results).ok()?;
        }
        3 => {
            counters.matches.fetch_add(1, Ordering::SeqCst);
            let req = xdr::deserialize::<ypreq_key>(&mut input).ok()?;
            let resp = match lookup_map(served, &req.domain, &req.map) {
                Err(stat) => ypresp_val { stat, val: Vec::new() },
                Ok(map) => match map.get(&req.key) {
                    Some(val) => ypresp_val { stat: ypstat::YP_TRUE, val: val.clone() },
                    None => ypresp_val { stat: ypstat::YP_NOKEY, val: Vec::new() },
                },
            };
            resp.serialize(&mut results).ok()?;
        }
        4 => {
            counters.first.fetch_add(1, Ordering::SeqCst);
            let req = xdr::deserialize::<ypreq_nokey>(&mut input).ok()?;
            let map = lookup_map(served, &req.domain, &req.map);
            walk(map, Bound::Unbounded).serialize(&mut results).ok()?;
        }
        5 => {
            counters.next.fetch_add(1, Ordering::SeqCst);
            let req = xdr::deserialize::<ypreq_key>(&mut input).ok()?;
            let map = lookup_map(served, &req.domain, &req.map);
            walk(map, Bound::Excluded(req.key)).serialize(&mut results).ok()?;
        }
        _ => {
            rpc::proc_unavail_reply_message(xid).serialize(&mut output).ok()?;
            return Some(output);
        }
    }

    rpc::make_success_reply(xid).serialize(&mut output).ok()?;
    output.extend_from_slice(&results);
    Some(output)
}

fn lookup_map<'a>(
    served: &'a Served,
    domain: &str,
    map: &str,
) -> Result<&'a BTreeMap<Vec<u8>, Vec<u8>>, ypstat> {
    if served.fail_next.swap(false, Ordering::SeqCst) {
        return Err(ypstat::YP_BADDB);
    }
    if domain != served.domain {
        return Err(ypstat::YP_NODOM);
    }
    match &served.map {
        Some(records) if map == rpcent::config::DEFAULT_MAP => Ok(records),
        _ => Err(ypstat::YP_NOMAP),
    }
}

fn walk(
    map: Result<&BTreeMap<Vec<u8>, Vec<u8>>, ypstat>,
    from: Bound<Vec<u8>>,
) -> ypresp_key_val {
    let map = match map {
        Ok(map) => map,
        Err(stat) => return ypresp_key_val { stat, ..Default::default() },
    };
    match map.range((from, Bound::Unbounded)).next() {
        Some((key, val)) => ypresp_key_val { stat: ypstat::YP_TRUE, val: val.clone(), key: key.clone() },
        None => ypresp_key_val { stat: ypstat::YP_NOMORE, ..Default::default() },
    }
}
