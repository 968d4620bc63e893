#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rdb_stream::{ParseFilter, RdbListener, RdbParser, RdbResult};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    version: u8,
    body: Vec<u8>,
    filter_db: Option<u8>,
}

/// Следит за балансом begin/end баз.
#[derive(Default)]
struct Balance {
    depth: i32,
}

impl RdbListener for Balance {
    fn begin_database(
        &mut self,
        _index: u64,
    ) -> RdbResult<()> {
        assert_eq!(self.depth, 0, "nested database");
        self.depth += 1;
        Ok(())
    }

    fn end_database(
        &mut self,
        _index: u64,
    ) -> RdbResult<()> {
        assert_eq!(self.depth, 1, "unbalanced database end");
        self.depth -= 1;
        Ok(())
    }
}

fuzz_target!(|input: FuzzInput| {
    // Корректный заголовок, чтобы фаззер сразу попадал в тело файла.
    let mut data = format!("REDIS{:04}", input.version % 10).into_bytes();
    data.extend_from_slice(&input.body);

    let mut parser = RdbParser::new(Cursor::new(data));
    if let Some(db) = input.filter_db {
        parser = parser.with_filter(ParseFilter::new().databases([db as u64]));
    }

    let mut listener = Balance::default();
    if parser.parse(&mut listener).is_ok() {
        assert_eq!(listener.depth, 0, "database left open after end");
    }
});
