//! MediaVault 核心库
//!
//! 个人媒体待玩/待看清单管理（游戏与电影）。本库提供数据实体、
//! 数据访问层与备份/恢复引擎；HTTP 路由、认证与前端由上层服务负责。

pub mod backup;
pub mod database;
pub mod entity;
