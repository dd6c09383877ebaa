pub mod packet_sender;
