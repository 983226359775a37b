//! Database schema.
//!
//! Table and column names follow the historical reduction database so
//! existing analysis queries keep working. Times are epoch seconds (REAL).

/// Schema creation, idempotent.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tbl_testcase (
    Test_Id INTEGER PRIMARY KEY AUTOINCREMENT,
    Description TEXT NOT NULL,
    Date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tbl_node_status (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Node_Id INTEGER NOT NULL,
    Start_Time INTEGER,
    End_Time INTEGER,
    IGMP_IP TEXT
);

CREATE TABLE IF NOT EXISTS tbl_packet_cap_test (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Node_Id INTEGER NOT NULL,
    FileName TEXT NOT NULL,
    Source_IP TEXT NOT NULL,
    Destination_IP TEXT NOT NULL,
    Destination_Port INTEGER NOT NULL,
    Time REAL NOT NULL,
    Frame_Length INTEGER NOT NULL,
    Packet_Id INTEGER NOT NULL,
    TX INTEGER NOT NULL,
    Hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tbl_rip (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Source_IP TEXT,
    RIP_IP TEXT NOT NULL,
    RIP_Metric INTEGER NOT NULL,
    RIP_Netmask TEXT NOT NULL,
    RIP_Next_hop TEXT NOT NULL,
    RIP_Time REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS tbl_neighbor (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Req_Time REAL NOT NULL DEFAULT 0,
    Resp_Time REAL,
    Node_Id TEXT NOT NULL,
    Island INTEGER NOT NULL,
    Adjacency TEXT NOT NULL,
    Cost INTEGER NOT NULL,
    Nbr_Node INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tbl_forward (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Req_Time REAL NOT NULL DEFAULT 0,
    Resp_Time REAL,
    Node_Id TEXT NOT NULL,
    Fwd_Node TEXT NOT NULL,
    Fwd_Hop INTEGER NOT NULL,
    Fwd_Cost TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tbl_battery (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Req_Time REAL NOT NULL DEFAULT 0,
    Resp_Time REAL,
    Batt_Level TEXT NOT NULL,
    Node_Id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tbl_positioninfo (
    Test_Id INTEGER NOT NULL REFERENCES tbl_testcase(Test_Id),
    Resp_Time REAL,
    Node_Id INTEGER NOT NULL,
    Latitude TEXT NOT NULL,
    Longitude TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_packet_hash ON tbl_packet_cap_test(Test_Id, Hash);
CREATE INDEX IF NOT EXISTS idx_rip_time ON tbl_rip(Test_Id, RIP_Time);
";

pub const INSERT_TESTCASE: &str = "INSERT INTO tbl_testcase (Description, Date) VALUES (?1, ?2)";

pub const INSERT_NODE_STATUS: &str =
    "INSERT INTO tbl_node_status (Test_Id, Node_Id, Start_Time, End_Time, IGMP_IP) VALUES (?1, ?2, ?3, ?4, ?5)";

pub const INSERT_PACKET: &str = "INSERT INTO tbl_packet_cap_test (Test_Id, Node_Id, FileName, Source_IP, \
     Destination_IP, Destination_Port, Time, Frame_Length, Packet_Id, TX, Hash) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

pub const INSERT_RIP: &str = "INSERT INTO tbl_rip (Test_Id, Source_IP, RIP_IP, RIP_Metric, RIP_Netmask, \
     RIP_Next_hop, RIP_Time) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub const INSERT_NEIGHBOR: &str = "INSERT INTO tbl_neighbor (Test_Id, Req_Time, Resp_Time, Node_Id, Island, \
     Adjacency, Cost, Nbr_Node) VALUES (?1, 0, ?2, ?3, ?4, ?5, ?6, ?7)";

pub const INSERT_FORWARD: &str = "INSERT INTO tbl_forward (Test_Id, Req_Time, Resp_Time, Node_Id, Fwd_Node, \
     Fwd_Hop, Fwd_Cost) VALUES (?1, 0, ?2, ?3, ?4, ?5, ?6)";

pub const INSERT_BATTERY: &str =
    "INSERT INTO tbl_battery (Test_Id, Req_Time, Resp_Time, Batt_Level, Node_Id) VALUES (?1, 0, ?2, ?3, ?4)";

pub const INSERT_POSITION: &str =
    "INSERT INTO tbl_positioninfo (Test_Id, Resp_Time, Node_Id, Latitude, Longitude) VALUES (?1, ?2, ?3, ?4, ?5)";
