pub mod manager_server;
